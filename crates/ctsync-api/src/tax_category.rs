use serde::{Deserialize, Serialize};

use crate::reference::{Reference, ResourceIdentifier};
use crate::resource::{CurrentResource, Draft};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRate {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRate {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub included_in_price: bool,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub sub_rates: Vec<SubRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRateDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub included_in_price: bool,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_rates: Vec<SubRate>,
}

impl TaxRateDraft {
    pub fn new(name: impl Into<String>, amount: f64, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: Some(amount),
            included_in_price: false,
            country: country.into(),
            state: None,
            sub_rates: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCategory {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub version: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rates: Vec<TaxRate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCategoryDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rates: Vec<TaxRateDraft>,
}

impl TaxCategoryDraft {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_rate(mut self, rate: TaxRateDraft) -> Self {
        self.rates.push(rate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TaxCategoryUpdateAction {
    ChangeName {
        name: String,
    },
    SetDescription {
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AddTaxRate {
        tax_rate: TaxRateDraft,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceTaxRate {
        tax_rate_id: String,
        tax_rate: TaxRateDraft,
    },
    #[serde(rename_all = "camelCase")]
    RemoveTaxRate {
        tax_rate_id: String,
    },
}

impl Draft for TaxCategoryDraft {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn for_each_reference(&self, _f: &mut dyn FnMut(&ResourceIdentifier)) {}

    fn for_each_reference_mut(&mut self, _f: &mut dyn FnMut(&mut ResourceIdentifier)) {}
}

impl CurrentResource for TaxCategory {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn for_each_reference(&self, _f: &mut dyn FnMut(&Reference)) {}

    fn for_each_reference_mut(&mut self, _f: &mut dyn FnMut(&mut Reference)) {}
}
