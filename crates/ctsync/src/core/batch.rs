//! Slicing helpers for batched remote calls.

/// Maximum number of ids sent in one key lookup request.
pub const KEY_LOOKUP_CHUNK_SIZE: usize = 500;

/// Upper bound for the rendered `key in (...)` predicate of one query.
pub const MAX_PREDICATE_LENGTH: usize = 10_000;

/// Splits `items` into consecutive batches of at most `batch_size`
/// elements, preserving order.
pub fn batch_elements<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Groups keys so that the predicate rendered for each group stays within
/// `max_length` characters.
///
/// Every key costs its length plus quotes and a separator. A single key
/// longer than the limit still gets its own group.
pub fn chunk_keys_by_predicate_length<'a, I>(keys: I, max_length: usize) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a String>,
{
    const PREDICATE_OVERHEAD: usize = "key in ()".len();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut length = PREDICATE_OVERHEAD;

    for key in keys {
        let cost = key.len() + 4;
        if !current.is_empty() && length + cost > max_length {
            chunks.push(std::mem::take(&mut current));
            length = PREDICATE_OVERHEAD;
        }
        length += cost;
        current.push(key.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_keep_order_and_remainder() {
        let batches = batch_elements((1..=7).collect(), 3);
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn zero_batch_size_is_treated_as_one() {
        assert_eq!(batch_elements(vec!['a', 'b'], 0), vec![vec!['a'], vec!['b']]);
        assert!(batch_elements(Vec::<u8>::new(), 5).is_empty());
    }

    #[test]
    fn predicate_chunks_respect_limit() {
        let keys: Vec<String> = (0..100).map(|i| format!("key-{i:04}")).collect();
        let chunks = chunk_keys_by_predicate_length(&keys, 120);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let rendered: usize = chunk.iter().map(|k| k.len() + 4).sum::<usize>() + 9;
            assert!(rendered <= 120, "chunk too long: {rendered}");
        }
        let flattened: Vec<String> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, keys);
    }

    #[test]
    fn oversized_key_gets_own_chunk() {
        let keys = vec!["x".repeat(50), "a".into()];
        let chunks = chunk_keys_by_predicate_length(&keys, 20);
        assert_eq!(chunks.len(), 2);
    }
}
