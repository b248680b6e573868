//! Filters malformed drafts out of a batch and harvests the keys they
//! reference.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use ctsync_api::{Draft, ReferenceTypeId};

use super::error::SyncError;
use super::service::ResourceKind;

/// Keys referenced by valid drafts, grouped by reference type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedKeys(BTreeMap<ReferenceTypeId, BTreeSet<String>>);

impl ReferencedKeys {
    pub fn insert(&mut self, type_id: ReferenceTypeId, key: impl Into<String>) {
        self.0.entry(type_id).or_default().insert(key.into());
    }

    pub fn get(&self, type_id: ReferenceTypeId) -> Option<&BTreeSet<String>> {
        self.0.get(&type_id)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReferenceTypeId, &str)> {
        self.0
            .iter()
            .flat_map(|(type_id, keys)| keys.iter().map(move |key| (*type_id, key.as_str())))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult<D> {
    /// Accepted drafts in input order.
    pub valid_drafts: Vec<D>,
    /// Keys the valid drafts point at. Informational for callers: the
    /// orchestrator resolves references by id and only logs the count.
    pub referenced_keys: ReferencedKeys,
}

/// Stateless draft validation for one resource kind.
pub struct BatchValidator<R: ResourceKind> {
    _kind: PhantomData<R>,
}

impl<R: ResourceKind> BatchValidator<R> {
    /// Checks every draft in order and reports each rejected one once
    /// through `on_error`, together with the draft when there is one.
    ///
    /// Rejected are: absent drafts, drafts with a blank key, drafts whose
    /// custom type identifier is blank, and drafts failing the
    /// kind-specific check. Invalid drafts are dropped whole.
    pub fn validate<F>(drafts: &[Option<R::Draft>], mut on_error: F) -> ValidationResult<R::Draft>
    where
        F: FnMut(SyncError, Option<&R::Draft>),
    {
        let mut valid_drafts = Vec::with_capacity(drafts.len());
        let mut referenced_keys = ReferencedKeys::default();

        for draft in drafts {
            let Some(draft) = draft else {
                on_error(SyncError::NullDraft, None);
                continue;
            };
            match Self::validate_draft(draft) {
                Ok(()) => {
                    draft.for_each_reference(&mut |identifier| {
                        if let Some(key) = identifier.key.as_deref().filter(|k| !k.trim().is_empty())
                        {
                            referenced_keys.insert(identifier.type_id, key);
                        }
                    });
                    valid_drafts.push(draft.clone());
                }
                Err(error) => on_error(error, Some(draft)),
            }
        }

        ValidationResult {
            valid_drafts,
            referenced_keys,
        }
    }

    fn validate_draft(draft: &R::Draft) -> Result<(), SyncError> {
        let key = match draft.key() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(SyncError::missing_key(draft.display_name())),
        };
        if draft
            .custom()
            .is_some_and(|custom| custom.type_ref.is_blank())
        {
            return Err(SyncError::invalid_draft(
                key,
                "custom type identifier is blank",
            ));
        }
        R::validate_draft(draft).map_err(|message| SyncError::invalid_draft(key, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CategoryResource, TaxCategoryResource};
    use ctsync_api::category::CategoryDraft;
    use ctsync_api::tax_category::{TaxCategoryDraft, TaxRateDraft};
    use ctsync_api::{CustomFieldsDraft, LocalizedString, ResourceIdentifier};

    fn category(key: &str) -> CategoryDraft {
        CategoryDraft::new(key, LocalizedString::of("en", "Shoes"), LocalizedString::of("en", "shoes"))
    }

    #[test]
    fn rejects_null_and_blank_keys_in_order() {
        let mut blank = category("  ");
        blank.name = LocalizedString::of("en", "Boots");
        let drafts = vec![Some(category("a")), None, Some(blank), Some(category("b"))];

        let mut errors = Vec::new();
        let result = BatchValidator::<CategoryResource>::validate(&drafts, |error, draft| {
            errors.push((error.to_string(), draft.is_some()));
        });

        assert_eq!(
            result
                .valid_drafts
                .iter()
                .map(|d| d.key.clone().unwrap())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(
            errors,
            vec![
                ("draft is null".to_string(), false),
                ("draft with name Boots has no key".to_string(), true),
            ]
        );
    }

    #[test]
    fn harvests_referenced_keys() {
        let mut draft = category("a");
        draft.parent = Some(ResourceIdentifier::by_key(ReferenceTypeId::Category, "root"));
        draft.custom = Some(CustomFieldsDraft::new(ResourceIdentifier::by_key(
            ReferenceTypeId::Type,
            "category-extras",
        )));
        let mut by_id = category("b");
        by_id.parent = Some(ResourceIdentifier::by_id(ReferenceTypeId::Category, "some-id"));

        let result =
            BatchValidator::<CategoryResource>::validate(&[Some(draft), Some(by_id)], |_, _| {
                panic!("no errors expected")
            });

        assert_eq!(result.referenced_keys.len(), 2);
        assert!(result
            .referenced_keys
            .get(ReferenceTypeId::Category)
            .unwrap()
            .contains("root"));
        assert!(result
            .referenced_keys
            .get(ReferenceTypeId::Type)
            .unwrap()
            .contains("category-extras"));
    }

    #[test]
    fn blank_custom_type_rejects_draft() {
        let mut draft = category("a");
        draft.custom = Some(CustomFieldsDraft::new(ResourceIdentifier::by_key(
            ReferenceTypeId::Type,
            "",
        )));

        let mut errors = Vec::new();
        let result = BatchValidator::<CategoryResource>::validate(&[Some(draft)], |error, _| {
            errors.push(error)
        });

        assert!(result.valid_drafts.is_empty());
        assert!(matches!(errors.as_slice(), [SyncError::InvalidDraft { key, .. }] if key == "a"));
    }

    #[test]
    fn kind_specific_failure_drops_whole_draft() {
        let draft = TaxCategoryDraft::new("vat", "VAT")
            .with_rate(TaxRateDraft::new("DE", 0.19, "DE"))
            .with_rate(TaxRateDraft::new("FR", 0.2, "FR"))
            .with_rate(TaxRateDraft::new("DE again", 0.07, "DE"));

        let mut errors = Vec::new();
        let result =
            BatchValidator::<TaxCategoryResource>::validate(&[Some(draft)], |error, draft| {
                errors.push((error, draft.cloned()))
            });

        assert!(result.valid_drafts.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.is_some());
    }
}
