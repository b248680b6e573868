//! Shared value types for catalog synchronization.
//!
//! Everything here is plain data: references, custom fields, the per-kind
//! resource models with their drafts and update actions, and the transport
//! error taxonomy. No I/O happens in this crate.

use serde::{Deserialize, Serialize};

pub mod category;
pub mod common;
pub mod custom;
pub mod error;
pub mod product;
pub mod reference;
pub mod resource;
pub mod tax_category;

pub use common::{LocalizedString, Money};
pub use custom::{CustomAction, CustomFields, CustomFieldsDraft, FieldContainer};
pub use error::ApiError;
pub use reference::{Reference, ReferenceTypeId, ResourceIdentifier};
pub use resource::{CurrentResource, Draft};

/// One page of a remote query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedQueryResponse<T> {
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub total: Option<usize>,
    pub results: Vec<T>,
}

/// Minimal projection used when only the id/key pair of a resource matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedResource {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
}
