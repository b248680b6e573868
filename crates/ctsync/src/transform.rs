//! Turning resources fetched from a source project into drafts for a
//! target project.
//!
//! Ids are meaningless across projects, so every reference is rewritten
//! to its key before the resource is copied into a draft.

use ctsync_api::ApiError;

use crate::core::cache::ReferenceIdToKeyCache;
use crate::core::references::expand_all;
use crate::core::service::ResourceKind;

/// Resource kinds whose current representation can be copied into a
/// draft.
pub trait ToDraft: ResourceKind {
    /// References keep their key when known and fall back to the id.
    fn to_draft(current: &Self::Current) -> Self::Draft;
}

/// Converts `resources` into drafts, resolving referenced ids to keys with
/// one batched lookup per reference type.
pub async fn to_drafts<R: ToDraft>(
    mut resources: Vec<R::Current>,
    cache: &ReferenceIdToKeyCache,
) -> Result<Vec<R::Draft>, ApiError> {
    expand_all(&mut resources, cache).await?;
    Ok(resources.iter().map(R::to_draft).collect())
}
