//! Bounded id to key cache used for reference resolution.

use futures::future::try_join_all;
use lru::LruCache;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use ctsync_api::{ApiError, ReferenceTypeId};

use super::batch::KEY_LOOKUP_CHUNK_SIZE;
use super::service::KeyLookup;

pub const DEFAULT_CACHE_SIZE: usize = 10_000;

/// Keys found for the ids of one fill, by id.
pub type ResolvedKeys = HashMap<String, String>;

/// Maps remote resource ids to their keys.
///
/// Keys are immutable once assigned by the remote, so an entry never goes
/// stale. Eviction only turns a later lookup into a miss. The cache is
/// safe to share between concurrent batch workers.
pub struct ReferenceIdToKeyCache {
    entries: Mutex<LruCache<String, String>>,
    lookup: Arc<dyn KeyLookup>,
}

impl ReferenceIdToKeyCache {
    pub fn new(capacity: usize, lookup: Arc<dyn KeyLookup>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            lookup,
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached key for `id`, if any.
    pub fn get(&self, id: &str) -> Option<String> {
        self.entries().get(id).cloned()
    }

    pub fn add(&self, id: impl Into<String>, key: impl Into<String>) {
        self.entries().put(id.into(), key.into());
    }

    pub fn size(&self) -> usize {
        self.entries().len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Resolves every id of `ids` to its key, asking the remote only for
    /// ids not yet cached, and stores the fetched keys.
    ///
    /// The returned map holds every requested id that has a key, cached or
    /// fetched, independent of what the bounded cache keeps afterwards.
    /// The working set is de-duplicated before dispatch and split into
    /// requests of at most [`KEY_LOOKUP_CHUNK_SIZE`] ids. Ids the remote
    /// returns no key for stay uncached. Any failed request fails the
    /// whole fill.
    pub async fn fill_from_remote<'a, I>(
        &self,
        type_id: ReferenceTypeId,
        ids: I,
    ) -> Result<ResolvedKeys, ApiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = ResolvedKeys::new();
        let missing: Vec<String> = {
            let mut entries = self.entries();
            let mut seen = HashSet::new();
            let mut missing = Vec::new();
            for id in ids {
                if id.is_empty() || !seen.insert(id) {
                    continue;
                }
                match entries.get(id) {
                    Some(key) => {
                        resolved.insert(id.to_string(), key.clone());
                    }
                    None => missing.push(id.to_string()),
                }
            }
            missing
        };
        if missing.is_empty() {
            return Ok(resolved);
        }

        debug!(
            "[ReferenceIdToKeyCache] Fetching keys for {} {} id(s)",
            missing.len(),
            type_id
        );

        let lookups = missing
            .chunks(KEY_LOOKUP_CHUNK_SIZE)
            .map(|chunk| self.lookup.fetch_keys_by_ids(type_id, chunk));
        let results = try_join_all(lookups).await?;

        let mut entries = self.entries();
        for (id, key) in results.into_iter().flatten() {
            entries.put(id.clone(), key.clone());
            resolved.insert(id, key);
        }
        Ok(resolved)
    }

    /// Resolves ids of several reference types.
    pub async fn fill_all(
        &self,
        ids_by_type: &BTreeMap<ReferenceTypeId, HashSet<String>>,
    ) -> Result<ResolvedKeys, ApiError> {
        let mut resolved = ResolvedKeys::new();
        for (type_id, ids) in ids_by_type {
            resolved.extend(
                self.fill_from_remote(*type_id, ids.iter().map(String::as_str))
                    .await?,
            );
        }
        Ok(resolved)
    }
}
