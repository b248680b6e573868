//! Building blocks shared by the per-kind update action builders.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// `Some(make())` when `old` and `new` differ.
pub fn build_update_action<T, A>(old: &T, new: &T, make: impl FnOnce() -> A) -> Option<A>
where
    T: PartialEq + ?Sized,
{
    (old != new).then(make)
}

/// Where an action sits relative to the collection it mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionPhase {
    /// Scalar fields and anything not bound to a collection item.
    Field,
    Remove,
    Change,
    Add,
}

/// Update actions that know their phase.
///
/// Implementations match exhaustively on the action enum so that adding
/// a variant forces a decision about its phase.
pub trait PhasedAction {
    fn phase(&self) -> ActionPhase;
}

/// Stable sort of collection actions: removes, then changes, then adds.
///
/// Field actions are left where they are relative to each other and all
/// precede collection actions.
pub fn sort_collection_actions<A: PhasedAction>(actions: &mut [A]) {
    actions.sort_by_key(PhasedAction::phase);
}

/// True when no collection action is followed by one of an earlier phase.
pub fn is_collection_ordered<A: PhasedAction>(actions: &[A]) -> bool {
    actions
        .iter()
        .filter(|action| action.phase() != ActionPhase::Field)
        .map(PhasedAction::phase)
        .collect::<Vec<_>>()
        .windows(2)
        .all(|pair| pair[0] <= pair[1])
}

/// Result of matching two collections by item identity.
#[derive(Debug)]
pub struct Classification<'a, O, N> {
    pub removed: Vec<&'a O>,
    pub matched: Vec<(&'a O, &'a N)>,
    pub added: Vec<&'a N>,
}

/// Three-way classification of `old` against `new` by a stable identity.
///
/// Order follows `old` for removed and matched items and `new` for added
/// ones. Items sharing an identity are paired up in order; surplus ones on
/// either side count as removed or added.
pub fn classify<'a, O, N, K>(
    old: &'a [O],
    new: &'a [N],
    old_identity: impl Fn(&O) -> K,
    new_identity: impl Fn(&N) -> K,
) -> Classification<'a, O, N>
where
    K: Eq + Hash,
{
    let mut indexes_by_identity: HashMap<K, VecDeque<usize>> = HashMap::with_capacity(new.len());
    for (index, item) in new.iter().enumerate() {
        indexes_by_identity
            .entry(new_identity(item))
            .or_default()
            .push_back(index);
    }

    let mut used = vec![false; new.len()];
    let mut removed = Vec::new();
    let mut matched = Vec::new();
    for item in old {
        match indexes_by_identity
            .get_mut(&old_identity(item))
            .and_then(VecDeque::pop_front)
        {
            Some(index) => {
                used[index] = true;
                matched.push((item, &new[index]));
            }
            None => removed.push(item),
        }
    }

    let added = new
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(item, _)| item)
        .collect();

    Classification {
        removed,
        matched,
        added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Rename,
        Remove(u8),
        Change(u8),
        Add(u8),
    }

    impl PhasedAction for Op {
        fn phase(&self) -> ActionPhase {
            match self {
                Op::Rename => ActionPhase::Field,
                Op::Remove(_) => ActionPhase::Remove,
                Op::Change(_) => ActionPhase::Change,
                Op::Add(_) => ActionPhase::Add,
            }
        }
    }

    #[test]
    fn update_action_only_on_difference() {
        assert_eq!(build_update_action(&1, &1, || "x"), None);
        assert_eq!(build_update_action("a", "b", || "x"), Some("x"));
    }

    #[test]
    fn classifies_by_identity_not_position() {
        let old = [("a", 1), ("b", 2), ("c", 3)];
        let new = [("c", 30), ("d", 4), ("a", 1)];
        let result = classify(&old, &new, |o| o.0, |n| n.0);

        assert_eq!(result.removed, vec![&("b", 2)]);
        assert_eq!(result.matched, vec![(&("a", 1), &("a", 1)), (&("c", 3), &("c", 30))]);
        assert_eq!(result.added, vec![&("d", 4)]);
    }

    #[test]
    fn repeated_identities_pair_up_in_order() {
        let old = [("a", 1)];
        let new = [("a", 1), ("a", 2)];
        let result = classify(&old, &new, |o| o.0, |n| n.0);

        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.added, vec![&("a", 2)]);
        assert!(result.removed.is_empty());

        let old = [("a", 1), ("a", 2)];
        let new = [("a", 1), ("a", 2)];
        let result = classify(&old, &new, |o| o.0, |n| n.0);
        assert_eq!(result.matched, vec![(&("a", 1), &("a", 1)), (&("a", 2), &("a", 2))]);
        assert!(result.added.is_empty() && result.removed.is_empty());
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Rename),
            any::<u8>().prop_map(Op::Remove),
            any::<u8>().prop_map(Op::Change),
            any::<u8>().prop_map(Op::Add),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn sorting_orders_removes_changes_adds(mut ops in prop::collection::vec(arb_op(), 0..20)) {
            let before = ops.clone();
            sort_collection_actions(&mut ops);

            prop_assert!(is_collection_ordered(&ops));
            prop_assert_eq!(ops.len(), before.len());
            let adds_before: Vec<_> = before.iter().filter(|op| matches!(op, Op::Add(_))).collect();
            let adds_after: Vec<_> = ops.iter().filter(|op| matches!(op, Op::Add(_))).collect();
            prop_assert_eq!(adds_before, adds_after);
        }
    }
}
