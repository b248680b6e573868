use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::LocalizedString;
use crate::custom::{CustomAction, CustomFields, CustomFieldsDraft, FieldContainer};
use crate::reference::{Reference, ResourceIdentifier};
use crate::resource::{CurrentResource, Draft};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub version: u64,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default)]
    pub description: Option<LocalizedString>,
    #[serde(default)]
    pub parent: Option<Reference>,
    #[serde(default)]
    pub order_hint: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub meta_title: Option<LocalizedString>,
    #[serde(default)]
    pub meta_description: Option<LocalizedString>,
    #[serde(default)]
    pub meta_keywords: Option<LocalizedString>,
    #[serde(default)]
    pub custom: Option<CustomFields>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFieldsDraft>,
}

impl CategoryDraft {
    pub fn new(key: impl Into<String>, name: LocalizedString, slug: LocalizedString) -> Self {
        Self {
            key: Some(key.into()),
            name,
            slug,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CategoryUpdateAction {
    ChangeName {
        name: LocalizedString,
    },
    ChangeSlug {
        slug: LocalizedString,
    },
    SetDescription {
        description: Option<LocalizedString>,
    },
    ChangeParent {
        parent: ResourceIdentifier,
    },
    #[serde(rename_all = "camelCase")]
    ChangeOrderHint {
        order_hint: String,
    },
    #[serde(rename_all = "camelCase")]
    SetExternalId {
        external_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetMetaTitle {
        meta_title: Option<LocalizedString>,
    },
    #[serde(rename_all = "camelCase")]
    SetMetaDescription {
        meta_description: Option<LocalizedString>,
    },
    #[serde(rename_all = "camelCase")]
    SetMetaKeywords {
        meta_keywords: Option<LocalizedString>,
    },
    SetCustomType {
        #[serde(rename = "type")]
        type_ref: ResourceIdentifier,
        fields: FieldContainer,
    },
    RemoveCustomType,
    SetCustomField {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

impl From<CustomAction> for CategoryUpdateAction {
    fn from(action: CustomAction) -> Self {
        match action {
            CustomAction::SetCustomType { type_ref, fields } => {
                CategoryUpdateAction::SetCustomType { type_ref, fields }
            }
            CustomAction::RemoveCustomType => CategoryUpdateAction::RemoveCustomType,
            CustomAction::SetCustomField { name, value } => {
                CategoryUpdateAction::SetCustomField { name, value }
            }
        }
    }
}

impl Draft for CategoryDraft {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn display_name(&self) -> String {
        self.name
            .0
            .values()
            .next()
            .cloned()
            .unwrap_or_default()
    }

    fn custom(&self) -> Option<&CustomFieldsDraft> {
        self.custom.as_ref()
    }

    fn for_each_reference(&self, f: &mut dyn FnMut(&ResourceIdentifier)) {
        if let Some(parent) = &self.parent {
            f(parent);
        }
        if let Some(custom) = &self.custom {
            f(&custom.type_ref);
        }
    }

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut ResourceIdentifier)) {
        if let Some(parent) = &mut self.parent {
            f(parent);
        }
        if let Some(custom) = &mut self.custom {
            f(&mut custom.type_ref);
        }
    }
}

impl CurrentResource for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn custom(&self) -> Option<&CustomFields> {
        self.custom.as_ref()
    }

    fn for_each_reference(&self, f: &mut dyn FnMut(&Reference)) {
        if let Some(parent) = &self.parent {
            f(parent);
        }
        if let Some(custom) = &self.custom {
            f(&custom.type_ref);
        }
    }

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut Reference)) {
        if let Some(parent) = &mut self.parent {
            f(parent);
        }
        if let Some(custom) = &mut self.custom {
            f(&mut custom.type_ref);
        }
    }
}
