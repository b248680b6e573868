use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locale tag to text, ordered so equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedString(pub BTreeMap<String, String>);

impl LocalizedString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new().with(locale, text)
    }

    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(locale.into(), text.into());
        self
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub cent_amount: i64,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, cent_amount: i64) -> Self {
        Self {
            currency_code: currency_code.into(),
            cent_amount,
        }
    }
}
