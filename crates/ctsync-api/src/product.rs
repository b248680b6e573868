//! Products, reduced to what price synchronization touches: the master
//! variant and its prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{LocalizedString, Money};
use crate::custom::{CustomAction, CustomFields, CustomFieldsDraft, FieldContainer};
use crate::reference::{Reference, ResourceIdentifier};
use crate::resource::{CurrentResource, Draft};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub id: String,
    pub value: Money,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub customer_group: Option<Reference>,
    #[serde(default)]
    pub channel: Option<Reference>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub custom: Option<CustomFields>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDraft {
    pub value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_group: Option<ResourceIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ResourceIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFieldsDraft>,
}

impl PriceDraft {
    pub fn new(value: Money) -> Self {
        Self {
            value,
            country: None,
            customer_group: None,
            channel: None,
            valid_from: None,
            valid_until: None,
            custom: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_channel(mut self, channel: ResourceIdentifier) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_customer_group(mut self, group: ResourceIdentifier) -> Self {
        self.customer_group = Some(group);
        self
    }

    pub fn with_custom(mut self, custom: CustomFieldsDraft) -> Self {
        self.custom = Some(custom);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: u64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Vec<PriceDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub version: u64,
    pub product_type: Reference,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default)]
    pub description: Option<LocalizedString>,
    #[serde(default)]
    pub tax_category: Option<Reference>,
    pub master_variant: ProductVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub product_type: ResourceIdentifier,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_category: Option<ResourceIdentifier>,
    #[serde(default)]
    pub master_variant: ProductVariantDraft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ProductUpdateAction {
    ChangeName {
        name: LocalizedString,
    },
    ChangeSlug {
        slug: LocalizedString,
    },
    SetDescription {
        description: Option<LocalizedString>,
    },
    #[serde(rename_all = "camelCase")]
    SetTaxCategory {
        tax_category: Option<ResourceIdentifier>,
    },
    #[serde(rename_all = "camelCase")]
    SetSku {
        variant_id: u64,
        sku: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RemovePrice {
        price_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ChangePrice {
        price_id: String,
        price: PriceDraft,
    },
    #[serde(rename_all = "camelCase")]
    AddPrice {
        variant_id: u64,
        price: PriceDraft,
    },
    #[serde(rename_all = "camelCase")]
    SetProductPriceCustomType {
        price_id: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_ref: Option<ResourceIdentifier>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<FieldContainer>,
    },
    #[serde(rename_all = "camelCase")]
    SetProductPriceCustomField {
        price_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

impl ProductUpdateAction {
    /// Scopes a kind-independent custom action to one price.
    pub fn for_price(price_id: &str, action: CustomAction) -> Self {
        let price_id = price_id.to_string();
        match action {
            CustomAction::SetCustomType { type_ref, fields } => {
                ProductUpdateAction::SetProductPriceCustomType {
                    price_id,
                    type_ref: Some(type_ref),
                    fields: Some(fields),
                }
            }
            CustomAction::RemoveCustomType => ProductUpdateAction::SetProductPriceCustomType {
                price_id,
                type_ref: None,
                fields: None,
            },
            CustomAction::SetCustomField { name, value } => {
                ProductUpdateAction::SetProductPriceCustomField {
                    price_id,
                    name,
                    value,
                }
            }
        }
    }
}

fn price_draft_references_mut(price: &mut PriceDraft, f: &mut dyn FnMut(&mut ResourceIdentifier)) {
    if let Some(group) = &mut price.customer_group {
        f(group);
    }
    if let Some(channel) = &mut price.channel {
        f(channel);
    }
    if let Some(custom) = &mut price.custom {
        f(&mut custom.type_ref);
    }
}

impl Draft for ProductDraft {
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

    fn for_each_reference(&self, f: &mut dyn FnMut(&ResourceIdentifier)) {
        f(&self.product_type);
        if let Some(tax_category) = &self.tax_category {
            f(tax_category);
        }
        for price in &self.master_variant.prices {
            if let Some(group) = &price.customer_group {
                f(group);
            }
            if let Some(channel) = &price.channel {
                f(channel);
            }
            if let Some(custom) = &price.custom {
                f(&custom.type_ref);
            }
        }
    }

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut ResourceIdentifier)) {
        f(&mut self.product_type);
        if let Some(tax_category) = &mut self.tax_category {
            f(tax_category);
        }
        for price in &mut self.master_variant.prices {
            price_draft_references_mut(price, f);
        }
    }
}

impl CurrentResource for Product {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn for_each_reference(&self, f: &mut dyn FnMut(&Reference)) {
        f(&self.product_type);
        if let Some(tax_category) = &self.tax_category {
            f(tax_category);
        }
        for price in &self.master_variant.prices {
            if let Some(group) = &price.customer_group {
                f(group);
            }
            if let Some(channel) = &price.channel {
                f(channel);
            }
            if let Some(custom) = &price.custom {
                f(&custom.type_ref);
            }
        }
    }

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut Reference)) {
        f(&mut self.product_type);
        if let Some(tax_category) = &mut self.tax_category {
            f(tax_category);
        }
        for price in &mut self.master_variant.prices {
            if let Some(group) = &mut price.customer_group {
                f(group);
            }
            if let Some(channel) = &mut price.channel {
                f(channel);
            }
            if let Some(custom) = &mut price.custom {
                f(&mut custom.type_ref);
            }
        }
    }
}
