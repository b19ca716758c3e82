//! Default values for schema types.
//!
//! [`resolve_default`] maps a [`FieldType`] (and an optional seed value that
//! takes precedence) to a concrete value. It never fails: unrecognized tags
//! resolve to the seed or an empty string.
//!
//! Declared schema `default`s are deliberately not applied here. The form
//! builder decides which field kinds honour them.

use std::collections::BTreeMap;

use crate::clock::{format_date, format_date_time_local, ClockSource};
use crate::object_id;
use crate::schema::{classify, FieldType, Schema, TypeTag};
use crate::types::Value;

/// Zero value of a scalar tag.
///
/// | tag              | value                          |
/// |------------------|--------------------------------|
/// | `String`         | `""`                           |
/// | `Number`/`Int32` | `0`                            |
/// | `Decimal`        | `0.0`                          |
/// | `Boolean`        | `false`                        |
/// | `Date`           | today, `YYYY-MM-DD`            |
/// | `DateTimeLocal`  | now, `YYYY-MM-DDTHH:MM`        |
/// | `ObjectId`       | fresh 24-char hex identifier   |
/// | `Mixed`          | `{}`                           |
/// | `Unknown`        | `""`                           |
#[must_use]
pub fn zero_value(tag: &TypeTag, clock: &dyn ClockSource) -> Value {
    match tag {
        TypeTag::String | TypeTag::Unknown(_) => Value::String(String::new()),
        TypeTag::Number | TypeTag::Int32 => Value::Int(0),
        TypeTag::Decimal => Value::Float(0.0),
        TypeTag::Boolean => Value::Bool(false),
        TypeTag::Date => Value::String(format_date(clock.now())),
        TypeTag::DateTimeLocal => Value::String(format_date_time_local(clock.now())),
        TypeTag::ObjectId => Value::String(object_id::generate()),
        TypeTag::Mixed => Value::empty_map(),
    }
}

/// Resolves the value a field of `field_type` should start with.
///
/// A defined `seed` wins for scalars. Arrays re-resolve each seeded element,
/// or synthesize a single default element when there is no array seed.
/// Objects resolve key by key, taking per-key seeds from a map seed; a
/// defined non-map seed is shared by every key.
#[must_use]
pub fn resolve_default(field_type: &FieldType, seed: Option<&Value>, clock: &dyn ClockSource) -> Value {
    let seed = seed.filter(|s| s.is_defined());
    match field_type {
        FieldType::Scalar(tag) => match seed {
            Some(value) => value.clone(),
            None => zero_value(tag, clock),
        },
        FieldType::Array(element) => match seed {
            Some(Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .map(|item| resolve_default(&element.field_type, Some(item), clock))
                    .collect(),
            ),
            _ => Value::Array(vec![resolve_default(&element.field_type, None, clock)]),
        },
        FieldType::Object(schema) => resolve_schema_defaults(schema, seed, clock),
    }
}

/// Resolves every field of `schema` into a data map.
#[must_use]
pub fn resolve_schema_defaults(schema: &Schema, seed: Option<&Value>, clock: &dyn ClockSource) -> Value {
    let seed = seed.filter(|s| s.is_defined());
    let resolved: BTreeMap<String, Value> = schema
        .iter()
        .map(|(name, spec)| {
            let key_seed = match seed {
                Some(Value::Map(map)) => map.get(name),
                other => other,
            };
            (name.to_string(), resolve_default(&spec.field_type, key_seed, clock))
        })
        .collect();
    Value::Map(resolved)
}

/// Classifies a raw schema node, then resolves its default.
#[must_use]
pub fn resolve_default_json(
    raw: &serde_json::Value,
    seed: Option<&Value>,
    clock: &dyn ClockSource,
) -> Value {
    resolve_default(&classify(raw).field_type, seed, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::schema::FieldSpec;
    use chrono::NaiveDate;
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .and_then(|d| d.and_hms_opt(8, 30, 0))
                .expect("valid date"),
        )
    }

    fn scalar(tag: TypeTag) -> FieldType {
        FieldType::Scalar(tag)
    }

    #[test]
    fn primitive_zero_values() {
        let c = clock();
        assert_eq!(resolve_default(&scalar(TypeTag::String), None, &c), Value::from(""));
        assert_eq!(resolve_default(&scalar(TypeTag::Boolean), None, &c), Value::Bool(false));
        assert_eq!(resolve_default(&scalar(TypeTag::Int32), None, &c), Value::Int(0));
        assert_eq!(resolve_default(&scalar(TypeTag::Number), None, &c), Value::Int(0));
        assert_eq!(resolve_default(&scalar(TypeTag::Decimal), None, &c), Value::Float(0.0));
        assert_eq!(resolve_default(&scalar(TypeTag::Date), None, &c), Value::from("2024-05-17"));
        assert_eq!(
            resolve_default(&scalar(TypeTag::DateTimeLocal), None, &c),
            Value::from("2024-05-17T08:30")
        );
        assert_eq!(resolve_default(&scalar(TypeTag::Mixed), None, &c), Value::empty_map());
    }

    #[test]
    fn object_id_default_is_24_lowercase_hex() {
        let id = resolve_default(&scalar(TypeTag::ObjectId), None, &clock());
        let id = id.as_str().expect("string id");
        assert_eq!(id.len(), 24);
        assert!(id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn unknown_tags_fall_back_to_seed_or_empty_string() {
        let unknown = scalar(TypeTag::Unknown("Widget".into()));
        assert_eq!(resolve_default(&unknown, None, &clock()), Value::from(""));
        assert_eq!(
            resolve_default(&unknown, Some(&Value::Int(5)), &clock()),
            Value::Int(5)
        );
    }

    #[test]
    fn defined_seed_wins_for_scalars() {
        let c = clock();
        assert_eq!(
            resolve_default(&scalar(TypeTag::String), Some(&Value::from("hi")), &c),
            Value::from("hi")
        );
        assert_eq!(
            resolve_default(&scalar(TypeTag::Boolean), Some(&Value::Null), &c),
            Value::Bool(false)
        );
        assert_eq!(
            resolve_default(&scalar(TypeTag::Int32), Some(&Value::Float(f64::NAN)), &c),
            Value::Int(0)
        );
    }

    #[test]
    fn typed_array_without_seed_has_one_element() {
        let field = FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::String)));
        assert_eq!(
            resolve_default(&field, None, &clock()),
            Value::Array(vec![Value::from("")])
        );
    }

    #[test]
    fn typed_array_with_seed_resolves_each_element() {
        let field = FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::Int32)));
        let seed = Value::Array(vec![Value::Int(3), Value::Null]);
        assert_eq!(
            resolve_default(&field, Some(&seed), &clock()),
            Value::Array(vec![Value::Int(3), Value::Int(0)])
        );
        let empty = Value::Array(vec![]);
        assert_eq!(resolve_default(&field, Some(&empty), &clock()), empty);
    }

    #[test]
    fn nested_shapes_use_per_key_seeds() {
        let spec = classify(&json!({"lat": {"type": "Number"}, "label": {"type": "String"}}));
        let seed = Value::from(json!({"lat": 4}));
        assert_eq!(
            resolve_default(&spec.field_type, Some(&seed), &clock()),
            Value::from(json!({"lat": 4, "label": ""}))
        );
    }

    #[test]
    fn key_missing_from_map_seed_gets_no_seed() {
        let spec = classify(&json!({
            "a": {"type": "String"},
            "b": {"type": "String"},
            "inner": {"c": {"type": "String"}}
        }));
        let seed = Value::from(json!({"a": "x"}));
        assert_eq!(
            resolve_default(&spec.field_type, Some(&seed), &clock()),
            Value::from(json!({"a": "x", "b": "", "inner": {"c": ""}}))
        );
    }

    #[test]
    fn non_map_seed_is_shared_by_every_key() {
        let spec = classify(&json!({"a": {"type": "String"}, "b": {"type": "String"}}));
        assert_eq!(
            resolve_default(&spec.field_type, Some(&Value::from("x")), &clock()),
            Value::from(json!({"a": "x", "b": "x"}))
        );
    }

    #[test]
    fn array_of_objects() {
        let spec = classify(&json!([{"title": {"type": "String"}, "done": {"type": "Boolean"}}]));
        assert_eq!(
            resolve_default(&spec.field_type, None, &clock()),
            Value::from(json!([{"title": "", "done": false}]))
        );
    }

    #[test]
    fn declared_defaults_are_not_applied() {
        let spec = classify(&json!({"type": "Boolean", "default": true}));
        assert_eq!(resolve_default(&spec.field_type, None, &clock()), Value::Bool(false));
    }

    #[test]
    fn raw_json_inference() {
        let c = clock();
        assert_eq!(resolve_default_json(&json!(1.5), None, &c), Value::Float(0.0));
        assert_eq!(resolve_default_json(&json!(2), None, &c), Value::Int(0));
        assert_eq!(
            resolve_default_json(&json!("[Boolean]"), None, &c),
            Value::Array(vec![Value::Bool(false)])
        );
        assert_eq!(resolve_default_json(&json!([]), None, &c), Value::Array(vec![Value::empty_map()]));
    }
}
