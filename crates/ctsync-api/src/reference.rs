use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceTypeId {
    Category,
    Channel,
    CustomerGroup,
    Product,
    ProductType,
    State,
    TaxCategory,
    Type,
}

impl ReferenceTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTypeId::Category => "category",
            ReferenceTypeId::Channel => "channel",
            ReferenceTypeId::CustomerGroup => "customer-group",
            ReferenceTypeId::Product => "product",
            ReferenceTypeId::ProductType => "product-type",
            ReferenceTypeId::State => "state",
            ReferenceTypeId::TaxCategory => "tax-category",
            ReferenceTypeId::Type => "type",
        }
    }

    /// Path segment of the collection endpoint for this kind.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReferenceTypeId::Category => "categories",
            ReferenceTypeId::Channel => "channels",
            ReferenceTypeId::CustomerGroup => "customer-groups",
            ReferenceTypeId::Product => "products",
            ReferenceTypeId::ProductType => "product-types",
            ReferenceTypeId::State => "states",
            ReferenceTypeId::TaxCategory => "tax-categories",
            ReferenceTypeId::Type => "types",
        }
    }
}

impl fmt::Display for ReferenceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference held by a current resource.
///
/// The remote always answers with ids. `key` is filled in locally once the
/// id has been resolved, so diffing can compare keys on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub type_id: ReferenceTypeId,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Reference {
    pub fn new(type_id: ReferenceTypeId, id: impl Into<String>) -> Self {
        Self {
            type_id,
            id: id.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Key if resolved, id otherwise.
    pub fn identity(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }

    /// Identifier form used when this reference is copied into a draft.
    pub fn to_identifier(&self) -> ResourceIdentifier {
        match &self.key {
            Some(key) => ResourceIdentifier::by_key(self.type_id, key.clone()),
            None => ResourceIdentifier::by_id(self.type_id, self.id.clone()),
        }
    }
}

/// Reference held by a draft: either an opaque id or a human key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    pub type_id: ReferenceTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ResourceIdentifier {
    pub fn by_id(type_id: ReferenceTypeId, id: impl Into<String>) -> Self {
        Self {
            type_id,
            id: Some(id.into()),
            key: None,
        }
    }

    pub fn by_key(type_id: ReferenceTypeId, key: impl Into<String>) -> Self {
        Self {
            type_id,
            id: None,
            key: Some(key.into()),
        }
    }

    /// True when neither a non-blank key nor a non-blank id is present.
    pub fn is_blank(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.key) && blank(&self.id)
    }

    /// Id that still needs to be rewritten to a key.
    pub fn unresolved_id(&self) -> Option<&str> {
        match (&self.key, &self.id) {
            (None, Some(id)) if !id.trim().is_empty() => Some(id),
            _ => None,
        }
    }

    /// Key if present, id otherwise.
    pub fn identity(&self) -> Option<&str> {
        self.key.as_deref().or(self.id.as_deref())
    }

    /// Whether this identifier designates the same target as `reference`.
    ///
    /// Keys are compared when the identifier carries one, ids otherwise.
    pub fn matches(&self, reference: &Reference) -> bool {
        if self.type_id != reference.type_id {
            return false;
        }
        match (&self.key, &self.id) {
            (Some(key), _) => reference.key.as_deref() == Some(key.as_str()),
            (None, Some(id)) => reference.id == *id,
            (None, None) => false,
        }
    }
}

/// Compares an optional draft-side reference with an optional current one.
pub fn same_reference(draft: Option<&ResourceIdentifier>, current: Option<&Reference>) -> bool {
    match (draft, current) {
        (None, None) => true,
        (Some(d), Some(c)) => d.matches(c),
        _ => false,
    }
}
