//! Batch reconciliation of catalog resources.
//!
//! Drafts describing the desired state are sliced into batches, their
//! references are resolved through a bounded id-to-key cache, they are
//! validated, matched by key against the target catalog and then either
//! created or converged through a minimal list of update actions.

pub mod config;
pub mod core;
pub mod resources;
pub mod telemetry;
pub mod testing;
pub mod transform;

pub use crate::core::cache::ReferenceIdToKeyCache;
pub use crate::core::custom_fields::build_custom_actions;
pub use crate::core::error::{Result, SyncError};
pub use crate::core::options::{SyncOptions, SyncOptionsBuilder};
pub use crate::core::service::{KeyLookup, ResourceKind, ResourceService};
pub use crate::core::statistics::{BatchOutcome, StatisticsSnapshot, SyncStatistics};
pub use crate::core::sync::ResourceSync;
pub use crate::core::validator::{BatchValidator, ReferencedKeys, ValidationResult};
pub use crate::resources::{CategoryResource, ProductResource, TaxCategoryResource};
