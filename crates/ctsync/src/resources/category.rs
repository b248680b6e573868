use ctsync_api::category::{Category, CategoryDraft, CategoryUpdateAction};
use ctsync_api::reference::same_reference;
use ctsync_api::CustomFieldsDraft;

use crate::core::actions::build_update_action;
use crate::core::custom_fields::build_custom_actions;
use crate::core::service::ResourceKind;
use crate::transform::ToDraft;

/// Category synchronization.
pub struct CategoryResource;

impl ResourceKind for CategoryResource {
    type Draft = CategoryDraft;
    type Current = Category;
    type Action = CategoryUpdateAction;

    const RESOURCE_NAME: &'static str = "category";

    fn build_actions(old: &Category, new: &CategoryDraft) -> Vec<CategoryUpdateAction> {
        let mut actions: Vec<CategoryUpdateAction> = [
            build_update_action(&old.name, &new.name, || CategoryUpdateAction::ChangeName {
                name: new.name.clone(),
            }),
            build_update_action(&old.slug, &new.slug, || CategoryUpdateAction::ChangeSlug {
                slug: new.slug.clone(),
            }),
            build_update_action(&old.description, &new.description, || {
                CategoryUpdateAction::SetDescription {
                    description: new.description.clone(),
                }
            }),
            build_parent_action(old, new),
            build_order_hint_action(old, new),
            build_update_action(&old.external_id, &new.external_id, || {
                CategoryUpdateAction::SetExternalId {
                    external_id: new.external_id.clone(),
                }
            }),
            build_update_action(&old.meta_title, &new.meta_title, || {
                CategoryUpdateAction::SetMetaTitle {
                    meta_title: new.meta_title.clone(),
                }
            }),
            build_update_action(&old.meta_description, &new.meta_description, || {
                CategoryUpdateAction::SetMetaDescription {
                    meta_description: new.meta_description.clone(),
                }
            }),
            build_update_action(&old.meta_keywords, &new.meta_keywords, || {
                CategoryUpdateAction::SetMetaKeywords {
                    meta_keywords: new.meta_keywords.clone(),
                }
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        actions.extend(
            build_custom_actions(old.custom.as_ref(), new.custom.as_ref())
                .into_iter()
                .map(CategoryUpdateAction::from),
        );
        actions
    }
}

// The remote has no way to unset a parent, so an absent parent in the
// draft leaves the current one alone.
fn build_parent_action(old: &Category, new: &CategoryDraft) -> Option<CategoryUpdateAction> {
    let parent = new.parent.as_ref()?;
    (!same_reference(Some(parent), old.parent.as_ref())).then(|| {
        CategoryUpdateAction::ChangeParent {
            parent: parent.clone(),
        }
    })
}

fn build_order_hint_action(old: &Category, new: &CategoryDraft) -> Option<CategoryUpdateAction> {
    let order_hint = new.order_hint.as_ref()?;
    (old.order_hint.as_ref() != Some(order_hint)).then(|| CategoryUpdateAction::ChangeOrderHint {
        order_hint: order_hint.clone(),
    })
}

impl ToDraft for CategoryResource {
    fn to_draft(category: &Category) -> CategoryDraft {
        CategoryDraft {
            key: category.key.clone(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            parent: category.parent.as_ref().map(|parent| parent.to_identifier()),
            order_hint: category.order_hint.clone(),
            external_id: category.external_id.clone(),
            meta_title: category.meta_title.clone(),
            meta_description: category.meta_description.clone(),
            meta_keywords: category.meta_keywords.clone(),
            custom: category.custom.as_ref().map(|custom| CustomFieldsDraft {
                type_ref: custom.type_ref.to_identifier(),
                fields: custom.fields.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctsync_api::{
        CustomFields, LocalizedString, Reference, ReferenceTypeId, ResourceIdentifier,
    };
    use serde_json::json;

    fn current() -> Category {
        Category {
            id: "cat-1".into(),
            key: Some("shoes".into()),
            version: 4,
            name: LocalizedString::of("en", "Shoes"),
            slug: LocalizedString::of("en", "shoes"),
            description: None,
            parent: Some(Reference::new(ReferenceTypeId::Category, "cat-0").with_key("root")),
            order_hint: Some("0.5".into()),
            external_id: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            custom: Some(CustomFields {
                type_ref: Reference::new(ReferenceTypeId::Type, "type-1").with_key("extras"),
                fields: json!({"color": "red"}).as_object().cloned().unwrap_or_default(),
            }),
        }
    }

    #[test]
    fn identical_content_yields_no_actions() {
        let category = current();
        let draft = CategoryResource::to_draft(&category);
        assert!(CategoryResource::build_actions(&category, &draft).is_empty());
    }

    #[test]
    fn changed_fields_come_before_custom_actions() {
        let category = current();
        let mut draft = CategoryResource::to_draft(&category);
        draft.name = LocalizedString::of("en", "Footwear");
        draft.parent = Some(ResourceIdentifier::by_key(ReferenceTypeId::Category, "apparel"));
        if let Some(custom) = draft.custom.as_mut() {
            custom.fields.insert("color".into(), json!("blue"));
        }

        let actions = CategoryResource::build_actions(&category, &draft);
        assert_eq!(
            actions,
            vec![
                CategoryUpdateAction::ChangeName {
                    name: LocalizedString::of("en", "Footwear")
                },
                CategoryUpdateAction::ChangeParent {
                    parent: ResourceIdentifier::by_key(ReferenceTypeId::Category, "apparel")
                },
                CategoryUpdateAction::SetCustomField {
                    name: "color".into(),
                    value: Some(json!("blue"))
                },
            ]
        );
    }

    #[test]
    fn absent_parent_and_order_hint_are_not_unset() {
        let category = current();
        let mut draft = CategoryResource::to_draft(&category);
        draft.parent = None;
        draft.order_hint = None;

        assert!(CategoryResource::build_actions(&category, &draft).is_empty());
    }

    #[test]
    fn removing_custom_block_removes_type() {
        let category = current();
        let mut draft = CategoryResource::to_draft(&category);
        draft.custom = None;
        draft.description = Some(LocalizedString::of("de", "Schuhe"));

        assert_eq!(
            CategoryResource::build_actions(&category, &draft),
            vec![
                CategoryUpdateAction::SetDescription {
                    description: Some(LocalizedString::of("de", "Schuhe"))
                },
                CategoryUpdateAction::RemoveCustomType,
            ]
        );
    }
}
