//! Custom type and custom field diffing, shared by every resource kind and
//! by nested sub-resources such as prices.

use serde_json::Value;
use std::collections::BTreeSet;

use ctsync_api::{CustomAction, CustomFields, CustomFieldsDraft, FieldContainer};

/// Actions converging `old` custom fields to `new`.
///
/// - both absent: nothing
/// - `new` absent: one `RemoveCustomType`
/// - `old` absent or a different type: one `SetCustomType` carrying every
///   new field
/// - same type: one `SetCustomField` per differing field. Fields missing
///   from `new`, or set to `null`, are unset.
///
/// Changed and added fields come first in name order, followed by unset
/// fields.
pub fn build_custom_actions(
    old: Option<&CustomFields>,
    new: Option<&CustomFieldsDraft>,
) -> Vec<CustomAction> {
    match (old, new) {
        (None, None) => Vec::new(),
        (Some(_), None) => vec![CustomAction::RemoveCustomType],
        (None, Some(new)) => vec![set_custom_type(new)],
        (Some(old), Some(new)) => {
            if !new.type_ref.matches(&old.type_ref) {
                vec![set_custom_type(new)]
            } else {
                build_field_actions(&old.fields, &new.fields)
            }
        }
    }
}

fn set_custom_type(new: &CustomFieldsDraft) -> CustomAction {
    CustomAction::SetCustomType {
        type_ref: new.type_ref.clone(),
        fields: non_null_fields(&new.fields),
    }
}

fn non_null_fields(fields: &FieldContainer) -> FieldContainer {
    fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn present<'a>(fields: &'a FieldContainer, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|value| !value.is_null())
}

fn build_field_actions(old: &FieldContainer, new: &FieldContainer) -> Vec<CustomAction> {
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    let mut set = Vec::new();
    let mut unset = Vec::new();
    for name in names {
        match (present(old, name), present(new, name)) {
            (Some(old_value), Some(new_value)) if json_equal(old_value, new_value) => {}
            (_, Some(new_value)) => set.push(CustomAction::SetCustomField {
                name: name.clone(),
                value: Some(new_value.clone()),
            }),
            (Some(_), None) => unset.push(CustomAction::SetCustomField {
                name: name.clone(),
                value: None,
            }),
            (None, None) => {}
        }
    }
    set.extend(unset);
    set
}

/// Structural JSON equality.
///
/// Object member order never matters. Numbers compare by value, so `1`
/// and `1.0` are equal.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(name, x)| ys.get(name).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctsync_api::{Reference, ReferenceTypeId, ResourceIdentifier};
    use proptest::prelude::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldContainer {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn old_custom(type_key: &str, value: Value) -> CustomFields {
        CustomFields {
            type_ref: Reference::new(ReferenceTypeId::Type, format!("id-{type_key}"))
                .with_key(type_key),
            fields: fields(value),
        }
    }

    fn new_custom(type_key: &str, value: Value) -> CustomFieldsDraft {
        CustomFieldsDraft {
            type_ref: ResourceIdentifier::by_key(ReferenceTypeId::Type, type_key),
            fields: fields(value),
        }
    }

    #[test]
    fn both_absent_yields_nothing() {
        assert!(build_custom_actions(None, None).is_empty());
    }

    #[test]
    fn removed_block_yields_remove_custom_type() {
        let old = old_custom("t", json!({"a": 1}));
        assert_eq!(
            build_custom_actions(Some(&old), None),
            vec![CustomAction::RemoveCustomType]
        );
    }

    #[test]
    fn new_block_sets_type_with_all_fields() {
        let new = new_custom("t", json!({"a": 1, "b": null}));
        let actions = build_custom_actions(None, Some(&new));
        assert_eq!(
            actions,
            vec![CustomAction::SetCustomType {
                type_ref: ResourceIdentifier::by_key(ReferenceTypeId::Type, "t"),
                fields: fields(json!({"a": 1})),
            }]
        );
    }

    #[test]
    fn type_change_replaces_atomically() {
        let old = old_custom("t1", json!({"a": 1}));
        let new = new_custom("t2", json!({"a": 1}));
        let actions = build_custom_actions(Some(&old), Some(&new));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], CustomAction::SetCustomType { .. }));
    }

    #[test]
    fn type_given_by_id_matches_resolved_reference() {
        let old = old_custom("t", json!({"a": 1}));
        let new = CustomFieldsDraft {
            type_ref: ResourceIdentifier::by_id(ReferenceTypeId::Type, "id-t"),
            fields: fields(json!({"a": 1})),
        };
        assert!(build_custom_actions(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn key_order_does_not_matter() {
        let old = old_custom(
            "t",
            json!({"a": 1, "b": 2, "nested": {"x": [1, {"p": 1, "q": 2}], "y": true}}),
        );
        let new = new_custom(
            "t",
            json!({"nested": {"y": true, "x": [1, {"q": 2, "p": 1}]}, "b": 2, "a": 1}),
        );
        assert!(build_custom_actions(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn dropped_field_is_unset() {
        let old = old_custom("t", json!({"a": 1, "b": 2}));
        let new = new_custom("t", json!({"a": 1}));
        assert_eq!(
            build_custom_actions(Some(&old), Some(&new)),
            vec![CustomAction::SetCustomField {
                name: "b".into(),
                value: None
            }]
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let old = old_custom("t", json!({"a": null, "b": 2}));
        let new = new_custom("t", json!({"a": null, "b": null}));
        assert_eq!(
            build_custom_actions(Some(&old), Some(&new)),
            vec![CustomAction::SetCustomField {
                name: "b".into(),
                value: None
            }]
        );
    }

    #[test]
    fn changes_precede_unsets() {
        let old = old_custom("t", json!({"a": 1, "z": 1}));
        let new = new_custom("t", json!({"b": 2, "a": 3}));
        let actions = build_custom_actions(Some(&old), Some(&new));
        assert_eq!(
            actions,
            vec![
                CustomAction::SetCustomField {
                    name: "a".into(),
                    value: Some(json!(3))
                },
                CustomAction::SetCustomField {
                    name: "b".into(),
                    value: Some(json!(2))
                },
                CustomAction::SetCustomField {
                    name: "z".into(),
                    value: None
                },
            ]
        );
    }

    #[test]
    fn integer_and_float_forms_are_equal() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(!json_equal(&json!(1), &json!(1.5)));
        assert!(!json_equal(&json!([1, 2]), &json!([2, 1])));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn identical_fields_produce_no_actions(
            entries in prop::collection::btree_map("[a-e]{1,3}", arb_json(), 0..6)
        ) {
            let map: FieldContainer = entries.clone().into_iter().collect();
            let reversed: FieldContainer = entries.into_iter().rev().collect();
            let old = CustomFields {
                type_ref: Reference::new(ReferenceTypeId::Type, "id-t").with_key("t"),
                fields: map,
            };
            let new = CustomFieldsDraft {
                type_ref: ResourceIdentifier::by_key(ReferenceTypeId::Type, "t"),
                fields: reversed,
            };
            prop_assert!(build_custom_actions(Some(&old), Some(&new)).is_empty());
        }
    }
}
