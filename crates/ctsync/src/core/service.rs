//! Seams between the reconciliation engine and the outside world.
//!
//! A resource kind plugs into the engine by implementing [`ResourceKind`]
//! (pure diffing and validation) and by providing a [`ResourceService`]
//! (remote calls). Reference resolution talks to a [`KeyLookup`].

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use ctsync_api::{ApiError, CurrentResource, Draft, ReferenceTypeId};

/// Capabilities of one resource kind.
///
/// Implementations are zero-sized markers; all behavior is pure and
/// associated, so the orchestrator stays generic over kinds.
pub trait ResourceKind: Send + Sync + 'static {
    type Draft: Draft;
    type Current: CurrentResource;
    type Action: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Used in log lines and span fields.
    const RESOURCE_NAME: &'static str;

    /// Ordered list of mutations that converges `current` to `draft`.
    ///
    /// Both sides must already be reference-resolved. An empty list means
    /// the resource is up to date.
    fn build_actions(current: &Self::Current, draft: &Self::Draft) -> Vec<Self::Action>;

    /// Kind-specific structural checks on a draft with a non-blank key.
    fn validate_draft(_draft: &Self::Draft) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Remote operations on one resource kind.
#[async_trait]
pub trait ResourceService<R: ResourceKind>: Send + Sync {
    /// All current resources whose key is in `keys`. Unknown keys are
    /// simply absent from the result.
    async fn fetch_matching_by_keys(
        &self,
        keys: &HashSet<String>,
    ) -> std::result::Result<Vec<R::Current>, ApiError>;

    async fn fetch_by_key(&self, key: &str) -> std::result::Result<Option<R::Current>, ApiError>;

    async fn create(&self, draft: &R::Draft) -> std::result::Result<R::Current, ApiError>;

    /// Fails with [`ApiError::ConcurrentModification`] when `version` is stale.
    async fn update(
        &self,
        id: &str,
        version: u64,
        actions: &[R::Action],
    ) -> std::result::Result<R::Current, ApiError>;
}

/// Batched id to key lookup.
#[async_trait]
pub trait KeyLookup: Send + Sync {
    /// Keys for the given ids. Ids without a key (or unknown to the remote)
    /// are missing from the map.
    async fn fetch_keys_by_ids(
        &self,
        type_id: ReferenceTypeId,
        ids: &[String],
    ) -> std::result::Result<HashMap<String, String>, ApiError>;
}
