//! Custom type + custom fields block shared by all resource kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reference::{Reference, ResourceIdentifier};

/// Field name to JSON value.
pub type FieldContainer = serde_json::Map<String, Value>;

/// Custom fields as held by a current resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFields {
    #[serde(rename = "type")]
    pub type_ref: Reference,
    #[serde(default)]
    pub fields: FieldContainer,
}

/// Custom fields as requested by a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldsDraft {
    #[serde(rename = "type")]
    pub type_ref: ResourceIdentifier,
    #[serde(default)]
    pub fields: FieldContainer,
}

impl CustomFieldsDraft {
    pub fn new(type_ref: ResourceIdentifier) -> Self {
        Self {
            type_ref,
            fields: FieldContainer::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Kind-independent custom field mutation.
///
/// Every resource kind embeds these into its own action enum, so a single
/// diff routine serves them all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CustomAction {
    /// Replaces the type and every field in one step.
    #[serde(rename_all = "camelCase")]
    SetCustomType {
        #[serde(rename = "type")]
        type_ref: ResourceIdentifier,
        fields: FieldContainer,
    },
    RemoveCustomType,
    /// `value: None` unsets the field.
    SetCustomField {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}
