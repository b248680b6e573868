use chrono::{DateTime, Utc};
use std::collections::HashSet;

use ctsync_api::product::{
    Price, PriceDraft, Product, ProductDraft, ProductUpdateAction, ProductVariantDraft,
};
use ctsync_api::reference::same_reference;
use ctsync_api::{CustomFieldsDraft, Reference, ResourceIdentifier};

use crate::core::actions::{
    build_update_action, classify, sort_collection_actions, ActionPhase, PhasedAction,
};
use crate::core::custom_fields::build_custom_actions;
use crate::core::service::ResourceKind;
use crate::transform::ToDraft;

/// Product synchronization limited to product-level fields and the prices
/// of the master variant.
pub struct ProductResource;

/// Identity of a price within a variant.
///
/// The remote enforces uniqueness on this combination, which is why price
/// removals have to be sent before additions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceCompositeId {
    pub currency: String,
    pub country: Option<String>,
    pub channel: Option<String>,
    pub customer_group: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl PriceCompositeId {
    pub fn of_price(price: &Price) -> Self {
        let identity = |reference: &Option<Reference>| {
            reference.as_ref().map(|r| r.identity().to_string())
        };
        Self {
            currency: price.value.currency_code.clone(),
            country: price.country.clone(),
            channel: identity(&price.channel),
            customer_group: identity(&price.customer_group),
            valid_from: price.valid_from,
            valid_until: price.valid_until,
        }
    }

    pub fn of_draft(price: &PriceDraft) -> Self {
        let identity = |identifier: &Option<ResourceIdentifier>| {
            identifier
                .as_ref()
                .and_then(|i| i.identity())
                .map(str::to_string)
        };
        Self {
            currency: price.value.currency_code.clone(),
            country: price.country.clone(),
            channel: identity(&price.channel),
            customer_group: identity(&price.customer_group),
            valid_from: price.valid_from,
            valid_until: price.valid_until,
        }
    }
}

impl PhasedAction for ProductUpdateAction {
    fn phase(&self) -> ActionPhase {
        match self {
            ProductUpdateAction::ChangeName { .. }
            | ProductUpdateAction::ChangeSlug { .. }
            | ProductUpdateAction::SetDescription { .. }
            | ProductUpdateAction::SetTaxCategory { .. }
            | ProductUpdateAction::SetSku { .. } => ActionPhase::Field,
            ProductUpdateAction::RemovePrice { .. } => ActionPhase::Remove,
            ProductUpdateAction::ChangePrice { .. }
            | ProductUpdateAction::SetProductPriceCustomType { .. }
            | ProductUpdateAction::SetProductPriceCustomField { .. } => ActionPhase::Change,
            ProductUpdateAction::AddPrice { .. } => ActionPhase::Add,
        }
    }
}

impl ResourceKind for ProductResource {
    type Draft = ProductDraft;
    type Current = Product;
    type Action = ProductUpdateAction;

    const RESOURCE_NAME: &'static str = "product";

    fn build_actions(old: &Product, new: &ProductDraft) -> Vec<ProductUpdateAction> {
        let variant_id = old.master_variant.id;
        let mut actions: Vec<ProductUpdateAction> = [
            build_update_action(&old.name, &new.name, || ProductUpdateAction::ChangeName {
                name: new.name.clone(),
            }),
            build_update_action(&old.slug, &new.slug, || ProductUpdateAction::ChangeSlug {
                slug: new.slug.clone(),
            }),
            build_update_action(&old.description, &new.description, || {
                ProductUpdateAction::SetDescription {
                    description: new.description.clone(),
                }
            }),
            (!same_reference(new.tax_category.as_ref(), old.tax_category.as_ref())).then(|| {
                ProductUpdateAction::SetTaxCategory {
                    tax_category: new.tax_category.clone(),
                }
            }),
            build_update_action(&old.master_variant.sku, &new.master_variant.sku, || {
                ProductUpdateAction::SetSku {
                    variant_id,
                    sku: new.master_variant.sku.clone(),
                }
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        actions.extend(build_price_actions(
            variant_id,
            &old.master_variant.prices,
            &new.master_variant.prices,
        ));
        sort_collection_actions(&mut actions);
        actions
    }

    fn validate_draft(draft: &ProductDraft) -> Result<(), String> {
        if draft.product_type.is_blank() {
            return Err("product type identifier is blank".to_string());
        }
        let mut seen = HashSet::new();
        for price in &draft.master_variant.prices {
            if price
                .custom
                .as_ref()
                .is_some_and(|custom| custom.type_ref.is_blank())
            {
                return Err(format!(
                    "price in {} has a blank custom type identifier",
                    price.value.currency_code
                ));
            }
            if !seen.insert(PriceCompositeId::of_draft(price)) {
                return Err(format!(
                    "master variant has duplicate prices for {} {}",
                    price.value.currency_code,
                    price.country.as_deref().unwrap_or("(all countries)")
                ));
            }
        }
        Ok(())
    }
}

fn build_price_actions(
    variant_id: u64,
    old: &[Price],
    new: &[PriceDraft],
) -> Vec<ProductUpdateAction> {
    let classification = classify(old, new, PriceCompositeId::of_price, PriceCompositeId::of_draft);

    let mut actions: Vec<ProductUpdateAction> = classification
        .removed
        .into_iter()
        .map(|price| ProductUpdateAction::RemovePrice {
            price_id: price.id.clone(),
        })
        .collect();

    for (old, new) in classification.matched {
        if old.value != new.value {
            actions.push(ProductUpdateAction::ChangePrice {
                price_id: old.id.clone(),
                price: new.clone(),
            });
        }
        actions.extend(
            build_custom_actions(old.custom.as_ref(), new.custom.as_ref())
                .into_iter()
                .map(|action| ProductUpdateAction::for_price(&old.id, action)),
        );
    }

    actions.extend(
        classification
            .added
            .into_iter()
            .map(|price| ProductUpdateAction::AddPrice {
                variant_id,
                price: price.clone(),
            }),
    );
    actions
}

fn price_to_draft(price: &Price) -> PriceDraft {
    PriceDraft {
        value: price.value.clone(),
        country: price.country.clone(),
        customer_group: price.customer_group.as_ref().map(Reference::to_identifier),
        channel: price.channel.as_ref().map(Reference::to_identifier),
        valid_from: price.valid_from,
        valid_until: price.valid_until,
        custom: price.custom.as_ref().map(|custom| CustomFieldsDraft {
            type_ref: custom.type_ref.to_identifier(),
            fields: custom.fields.clone(),
        }),
    }
}

impl ToDraft for ProductResource {
    fn to_draft(product: &Product) -> ProductDraft {
        ProductDraft {
            key: product.key.clone(),
            product_type: product.product_type.to_identifier(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            tax_category: product.tax_category.as_ref().map(Reference::to_identifier),
            master_variant: ProductVariantDraft {
                sku: product.master_variant.sku.clone(),
                prices: product.master_variant.prices.iter().map(price_to_draft).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::is_collection_ordered;
    use ctsync_api::product::ProductVariant;
    use ctsync_api::{CustomFields, LocalizedString, Money, ReferenceTypeId};
    use proptest::prelude::*;
    use serde_json::json;

    fn price(id: &str, currency: &str, country: Option<&str>, cents: i64) -> Price {
        Price {
            id: id.into(),
            value: Money::new(currency, cents),
            country: country.map(str::to_string),
            customer_group: None,
            channel: None,
            valid_from: None,
            valid_until: None,
            custom: None,
        }
    }

    fn product(prices: Vec<Price>) -> Product {
        Product {
            id: "p-1".into(),
            key: Some("tshirt".into()),
            version: 7,
            product_type: Reference::new(ReferenceTypeId::ProductType, "pt-1").with_key("apparel"),
            name: LocalizedString::of("en", "T-Shirt"),
            slug: LocalizedString::of("en", "t-shirt"),
            description: None,
            tax_category: Some(
                Reference::new(ReferenceTypeId::TaxCategory, "tc-1").with_key("standard"),
            ),
            master_variant: ProductVariant {
                id: 1,
                sku: Some("TS-1".into()),
                prices,
            },
        }
    }

    #[test]
    fn identical_content_yields_no_actions() {
        let current = product(vec![
            price("pr-1", "EUR", Some("DE"), 1_999),
            price("pr-2", "USD", None, 2_499),
        ]);
        let draft = ProductResource::to_draft(&current);
        assert!(ProductResource::build_actions(&current, &draft).is_empty());
    }

    #[test]
    fn colliding_price_is_removed_before_added() {
        let mut old_price = price("pr-1", "EUR", Some("DE"), 1_999);
        old_price.channel = Some(Reference::new(ReferenceTypeId::Channel, "ch-1").with_key("web"));
        let current = product(vec![old_price]);

        let mut draft = ProductResource::to_draft(&current);
        draft.master_variant.prices = vec![
            PriceDraft::new(Money::new("EUR", 1_899)).with_country("DE"),
        ];

        let actions = ProductResource::build_actions(&current, &draft);
        assert_eq!(
            actions,
            vec![
                ProductUpdateAction::RemovePrice {
                    price_id: "pr-1".into()
                },
                ProductUpdateAction::AddPrice {
                    variant_id: 1,
                    price: PriceDraft::new(Money::new("EUR", 1_899)).with_country("DE"),
                },
            ]
        );
    }

    #[test]
    fn changed_value_and_price_custom_fields() {
        let mut old_price = price("pr-1", "EUR", None, 1_000);
        old_price.custom = Some(CustomFields {
            type_ref: Reference::new(ReferenceTypeId::Type, "t-1").with_key("price-extras"),
            fields: json!({"note": "a"}).as_object().cloned().unwrap(),
        });
        let current = product(vec![old_price]);

        let mut draft = ProductResource::to_draft(&current);
        draft.master_variant.prices[0].value = Money::new("EUR", 1_200);
        draft.master_variant.prices[0]
            .custom
            .as_mut()
            .unwrap()
            .fields
            .insert("note".into(), json!("b"));
        draft.master_variant.prices.push(PriceDraft::new(Money::new("USD", 900)));
        draft.name = LocalizedString::of("en", "Tee");

        let actions = ProductResource::build_actions(&current, &draft);
        assert_eq!(actions.len(), 4);
        assert!(matches!(actions[0], ProductUpdateAction::ChangeName { .. }));
        assert!(matches!(actions[1], ProductUpdateAction::ChangePrice { .. }));
        assert_eq!(
            actions[2],
            ProductUpdateAction::SetProductPriceCustomField {
                price_id: "pr-1".into(),
                name: "note".into(),
                value: Some(json!("b")),
            }
        );
        assert!(matches!(actions[3], ProductUpdateAction::AddPrice { .. }));
    }

    #[test]
    fn tax_category_compared_by_key() {
        let current = product(vec![]);
        let mut draft = ProductResource::to_draft(&current);
        draft.tax_category = Some(ResourceIdentifier::by_key(
            ReferenceTypeId::TaxCategory,
            "standard",
        ));
        assert!(ProductResource::build_actions(&current, &draft).is_empty());

        draft.tax_category = Some(ResourceIdentifier::by_key(
            ReferenceTypeId::TaxCategory,
            "reduced",
        ));
        assert_eq!(ProductResource::build_actions(&current, &draft).len(), 1);
    }

    #[test]
    fn duplicate_price_identity_is_invalid() {
        let current = product(vec![]);
        let mut draft = ProductResource::to_draft(&current);
        draft.master_variant.prices = vec![
            PriceDraft::new(Money::new("EUR", 100)).with_country("DE"),
            PriceDraft::new(Money::new("EUR", 200)).with_country("DE"),
        ];
        assert!(ProductResource::validate_draft(&draft).is_err());

        draft.master_variant.prices[1] = PriceDraft::new(Money::new("EUR", 200))
            .with_country("DE")
            .with_channel(ResourceIdentifier::by_key(ReferenceTypeId::Channel, "store"));
        assert!(ProductResource::validate_draft(&draft).is_ok());
    }

    fn arb_price() -> impl Strategy<Value = (String, Option<String>, i64)> {
        (
            prop_oneof![Just("EUR".to_string()), Just("USD".to_string())],
            prop::option::of(prop_oneof![Just("DE".to_string()), Just("US".to_string())]),
            0i64..5,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn price_actions_are_always_ordered(
            old in prop::collection::vec(arb_price(), 0..6),
            new in prop::collection::vec(arb_price(), 0..6),
        ) {
            let current = product(
                old.iter()
                    .enumerate()
                    .map(|(i, (currency, country, cents))| {
                        price(&format!("pr-{i}"), currency, country.as_deref(), *cents)
                    })
                    .collect(),
            );
            let mut draft = ProductResource::to_draft(&current);
            draft.master_variant.prices = new
                .iter()
                .map(|(currency, country, cents)| PriceDraft {
                    country: country.clone(),
                    ..PriceDraft::new(Money::new(currency.clone(), *cents))
                })
                .collect();

            let actions = ProductResource::build_actions(&current, &draft);
            prop_assert!(is_collection_ordered(&actions));

            let same = ProductResource::to_draft(&current);
            prop_assert!(ProductResource::build_actions(&current, &same).is_empty());
        }
    }
}
