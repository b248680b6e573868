//! Rewriting references between ids and keys with the help of the cache.

use std::collections::{BTreeMap, HashSet};

use ctsync_api::{ApiError, CurrentResource, Draft, ReferenceTypeId, ResourceIdentifier};

use super::cache::{ReferenceIdToKeyCache, ResolvedKeys};

/// Ids grouped by the type of resource they point at.
pub type IdsByType = BTreeMap<ReferenceTypeId, HashSet<String>>;

/// Ids referenced by drafts that still lack a key.
pub fn collect_draft_ids<'a, D, I>(drafts: I) -> IdsByType
where
    D: Draft,
    I: IntoIterator<Item = &'a D>,
{
    let mut ids = IdsByType::new();
    for draft in drafts {
        draft.for_each_reference(&mut |identifier| {
            if let Some(id) = identifier.unresolved_id() {
                ids.entry(identifier.type_id)
                    .or_default()
                    .insert(id.to_string());
            }
        });
    }
    ids
}

/// Ids referenced by current resources whose key is not known yet.
pub fn collect_current_ids<'a, C, I>(resources: I) -> IdsByType
where
    C: CurrentResource,
    I: IntoIterator<Item = &'a C>,
{
    let mut ids = IdsByType::new();
    for resource in resources {
        resource.for_each_reference(&mut |reference| {
            if reference.key.is_none() && !reference.id.is_empty() {
                ids.entry(reference.type_id)
                    .or_default()
                    .insert(reference.id.clone());
            }
        });
    }
    ids
}

/// Replaces id references of `draft` with key references where `resolved`
/// has the key. Returns the identifiers that could not be resolved.
pub fn rewrite_draft_references<D: Draft>(
    draft: &mut D,
    resolved: &ResolvedKeys,
) -> Vec<ResourceIdentifier> {
    let mut unresolved = Vec::new();
    draft.for_each_reference_mut(&mut |identifier| {
        let Some(id) = identifier.unresolved_id() else {
            return;
        };
        match resolved.get(id).cloned() {
            Some(key) => {
                identifier.key = Some(key);
                identifier.id = None;
            }
            None => unresolved.push(identifier.clone()),
        }
    });
    unresolved
}

/// Fills in the keys of every reference of `resource` found in `resolved`.
pub fn expand_current_references<C: CurrentResource>(resource: &mut C, resolved: &ResolvedKeys) {
    resource.for_each_reference_mut(&mut |reference| {
        if reference.key.is_none() {
            reference.key = resolved.get(&reference.id).cloned();
        }
    });
}

/// Fetches missing keys for `resources` and writes them into their
/// references.
pub async fn expand_all<C: CurrentResource>(
    resources: &mut [C],
    cache: &ReferenceIdToKeyCache,
) -> Result<(), ApiError> {
    let ids = collect_current_ids(resources.iter());
    let resolved = cache.fill_all(&ids).await?;
    for resource in resources.iter_mut() {
        expand_current_references(resource, &resolved);
    }
    Ok(())
}
