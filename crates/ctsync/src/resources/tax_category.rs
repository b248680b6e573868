use std::collections::HashSet;

use ctsync_api::tax_category::{
    SubRate, TaxCategory, TaxCategoryDraft, TaxCategoryUpdateAction, TaxRate, TaxRateDraft,
};

use crate::core::actions::{
    build_update_action, classify, sort_collection_actions, ActionPhase, PhasedAction,
};
use crate::core::service::ResourceKind;
use crate::transform::ToDraft;

/// Tax category synchronization.
pub struct TaxCategoryResource;

/// Identity of a tax rate inside its category.
///
/// Country and state are compared exactly after trimming. A blank state is
/// the same as no state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxRateIdentity {
    pub country: String,
    pub state: Option<String>,
}

impl TaxRateIdentity {
    pub fn new(country: &str, state: Option<&str>) -> Self {
        Self {
            country: country.trim().to_string(),
            state: state
                .map(str::trim)
                .filter(|state| !state.is_empty())
                .map(str::to_string),
        }
    }

    fn of_rate(rate: &TaxRate) -> Self {
        Self::new(&rate.country, rate.state.as_deref())
    }

    fn of_draft(rate: &TaxRateDraft) -> Self {
        Self::new(&rate.country, rate.state.as_deref())
    }
}

impl PhasedAction for TaxCategoryUpdateAction {
    fn phase(&self) -> ActionPhase {
        match self {
            TaxCategoryUpdateAction::ChangeName { .. }
            | TaxCategoryUpdateAction::SetDescription { .. } => ActionPhase::Field,
            TaxCategoryUpdateAction::RemoveTaxRate { .. } => ActionPhase::Remove,
            TaxCategoryUpdateAction::ReplaceTaxRate { .. } => ActionPhase::Change,
            TaxCategoryUpdateAction::AddTaxRate { .. } => ActionPhase::Add,
        }
    }
}

impl ResourceKind for TaxCategoryResource {
    type Draft = TaxCategoryDraft;
    type Current = TaxCategory;
    type Action = TaxCategoryUpdateAction;

    const RESOURCE_NAME: &'static str = "tax category";

    fn build_actions(old: &TaxCategory, new: &TaxCategoryDraft) -> Vec<TaxCategoryUpdateAction> {
        let mut actions: Vec<TaxCategoryUpdateAction> = [
            build_update_action(&old.name, &new.name, || TaxCategoryUpdateAction::ChangeName {
                name: new.name.clone(),
            }),
            build_update_action(&old.description, &new.description, || {
                TaxCategoryUpdateAction::SetDescription {
                    description: new.description.clone(),
                }
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        actions.extend(build_tax_rate_actions(&old.rates, &new.rates));
        sort_collection_actions(&mut actions);
        actions
    }

    fn validate_draft(draft: &TaxCategoryDraft) -> Result<(), String> {
        let mut seen = HashSet::new();
        for rate in &draft.rates {
            let identity = TaxRateIdentity::of_draft(rate);
            if !seen.insert(identity.clone()) {
                return Err(format!(
                    "tax rates contain a duplicate for country '{}' and state '{}'",
                    identity.country,
                    identity.state.unwrap_or_default()
                ));
            }
        }
        Ok(())
    }
}

fn build_tax_rate_actions(old: &[TaxRate], new: &[TaxRateDraft]) -> Vec<TaxCategoryUpdateAction> {
    let classification = classify(old, new, TaxRateIdentity::of_rate, TaxRateIdentity::of_draft);

    let removes = classification
        .removed
        .into_iter()
        .map(|rate| TaxCategoryUpdateAction::RemoveTaxRate {
            tax_rate_id: rate.id.clone(),
        });
    let replaces = classification
        .matched
        .into_iter()
        .filter(|(old, new)| !has_same_fields(old, new))
        .map(|(old, new)| TaxCategoryUpdateAction::ReplaceTaxRate {
            tax_rate_id: old.id.clone(),
            tax_rate: new.clone(),
        });
    let adds = classification
        .added
        .into_iter()
        .map(|rate| TaxCategoryUpdateAction::AddTaxRate {
            tax_rate: rate.clone(),
        });

    removes.chain(replaces).chain(adds).collect()
}

fn has_same_fields(old: &TaxRate, new: &TaxRateDraft) -> bool {
    new.amount == Some(old.amount)
        && old.name.trim() == new.name.trim()
        && old.included_in_price == new.included_in_price
        && same_sub_rates(&old.sub_rates, &new.sub_rates)
}

fn same_sub_rates(old: &[SubRate], new: &[SubRate]) -> bool {
    let sorted = |rates: &[SubRate]| {
        let mut rates: Vec<(String, f64)> = rates
            .iter()
            .map(|rate| (rate.name.trim().to_string(), rate.amount))
            .collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        rates
    };
    sorted(old) == sorted(new)
}

impl ToDraft for TaxCategoryResource {
    fn to_draft(category: &TaxCategory) -> TaxCategoryDraft {
        TaxCategoryDraft {
            key: category.key.clone(),
            name: category.name.clone(),
            description: category.description.clone(),
            rates: category
                .rates
                .iter()
                .map(|rate| TaxRateDraft {
                    name: rate.name.clone(),
                    amount: Some(rate.amount),
                    included_in_price: rate.included_in_price,
                    country: rate.country.clone(),
                    state: rate.state.clone(),
                    sub_rates: rate.sub_rates.clone(),
                })
                .collect(),
        }
    }
}
