//! Payload sanitizing for create and update requests.

use std::collections::BTreeMap;

use tracing::debug;

use crate::object_id;
use crate::schema::Schema;
use crate::types::Value;

/// How a payload is about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    /// The document is a copy of an existing one.
    pub is_cloned: bool,
    /// The document has never been saved.
    pub is_new: bool,
    /// Primary identifier key, assigned by the server on create.
    pub id_field: String,
}

impl SubmitOptions {
    /// Options for updating an existing document.
    #[must_use]
    pub fn update() -> Self {
        Self::default()
    }

    /// Options for creating a new document.
    #[must_use]
    pub fn create() -> Self {
        Self {
            is_new: true,
            ..Self::default()
        }
    }

    /// Options for saving a clone of an existing document.
    #[must_use]
    pub fn clone_of() -> Self {
        Self {
            is_cloned: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    fn strips_id(&self) -> bool {
        self.is_cloned || self.is_new
    }
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            is_cloned: false,
            is_new: false,
            id_field: "_id".to_string(),
        }
    }
}

/// Filters `data` down to a payload safe to submit.
///
/// * `Null` and `NaN` values are dropped. Falsy but defined values (`0`,
///   `false`, `""`) are kept.
/// * For keys the schema declares as identifiers: the primary identifier
///   is dropped on create and clone so the server assigns a fresh one;
///   any other identifier survives only when well formed (see
///   [`object_id::is_valid`]).
/// * Everything else, including keys the schema does not declare, passes
///   through unchanged.
#[must_use]
pub fn validate_submitted_data(
    data: &BTreeMap<String, Value>,
    schema: &Schema,
    options: &SubmitOptions,
) -> BTreeMap<String, Value> {
    data.iter()
        .filter(|(key, value)| keep_entry(key, value, schema, options))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// [`validate_submitted_data`] over a `Value`. Non-map data yields an empty
/// payload.
#[must_use]
pub fn validate_submitted_value(
    data: &Value,
    schema: &Schema,
    options: &SubmitOptions,
) -> BTreeMap<String, Value> {
    data.as_map()
        .map(|map| validate_submitted_data(map, schema, options))
        .unwrap_or_default()
}

fn keep_entry(key: &str, value: &Value, schema: &Schema, options: &SubmitOptions) -> bool {
    if !value.is_defined() {
        debug!(field = key, "dropping undefined value from payload");
        return false;
    }
    let is_identifier = schema.get(key).is_some_and(|spec| spec.field_type.is_object_id());
    if !is_identifier {
        return true;
    }
    if key == options.id_field && options.strips_id() {
        debug!(field = key, "dropping primary identifier from new payload");
        return false;
    }
    if !object_id::is_valid(value) {
        debug!(field = key, "dropping malformed identifier from payload");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, TypeTag};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .field("_id", FieldSpec::scalar(TypeTag::ObjectId))
            .field("title", FieldSpec::scalar(TypeTag::String))
            .field("calendar", FieldSpec::scalar(TypeTag::ObjectId).with_reference("Calendar"))
    }

    fn map(json: serde_json::Value) -> BTreeMap<String, Value> {
        match Value::from(json) {
            Value::Map(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn clone_drops_primary_identifier() {
        let out = validate_submitted_data(
            &map(json!({"_id": "abc", "title": "x"})),
            &schema(),
            &SubmitOptions::clone_of(),
        );
        assert_eq!(out, map(json!({"title": "x"})));
    }

    #[test]
    fn create_drops_even_a_valid_primary_identifier() {
        let out = validate_submitted_data(
            &map(json!({"_id": "507f1f77bcf86cd799439011", "title": "x"})),
            &schema(),
            &SubmitOptions::create(),
        );
        assert_eq!(out, map(json!({"title": "x"})));
    }

    #[test]
    fn update_drops_invalid_identifier() {
        let out = validate_submitted_data(
            &map(json!({"_id": "not-a-valid-id", "title": "x"})),
            &schema(),
            &SubmitOptions::update(),
        );
        assert_eq!(out, map(json!({"title": "x"})));
    }

    #[test]
    fn update_keeps_valid_identifiers() {
        let data = map(json!({
            "_id": "507f1f77bcf86cd799439011",
            "calendar": "65a1b2c3d4e5f60718293a4b",
            "title": "x"
        }));
        let out = validate_submitted_data(&data, &schema(), &SubmitOptions::update());
        assert_eq!(out, data);
    }

    #[test]
    fn integer_identifiers_are_valid() {
        let out = validate_submitted_data(
            &map(json!({"calendar": 12})),
            &schema(),
            &SubmitOptions::update(),
        );
        assert_eq!(out, map(json!({"calendar": 12})));
    }

    #[test]
    fn references_are_kept_on_create() {
        let out = validate_submitted_data(
            &map(json!({"calendar": "65a1b2c3d4e5f60718293a4b", "title": "t"})),
            &schema(),
            &SubmitOptions::create(),
        );
        assert!(out.contains_key("calendar"));
    }

    #[test]
    fn drops_null_and_nan_keeps_falsy() {
        let mut data = BTreeMap::new();
        data.insert("b".to_string(), Value::Null);
        data.insert("c".to_string(), Value::Float(f64::NAN));
        data.insert("d".to_string(), Value::Int(0));
        data.insert("e".to_string(), Value::Bool(false));
        data.insert("f".to_string(), Value::from(""));
        let out = validate_submitted_data(&data, &Schema::new(), &SubmitOptions::update());
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["d", "e", "f"]);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let out = validate_submitted_data(
            &map(json!({"extra": {"nested": [1, 2]}})),
            &schema(),
            &SubmitOptions::update(),
        );
        assert_eq!(out, map(json!({"extra": {"nested": [1, 2]}})));
    }

    #[test]
    fn custom_id_field() {
        let schema = Schema::new().field("id", FieldSpec::scalar(TypeTag::ObjectId));
        let out = validate_submitted_data(
            &map(json!({"id": 4, "_id": "keep-me"})),
            &schema,
            &SubmitOptions::create().with_id_field("id"),
        );
        assert_eq!(out, map(json!({"_id": "keep-me"})));
    }

    #[test]
    fn undeclared_primary_identifier_passes_through_on_create() {
        let schema = Schema::new().field("title", FieldSpec::scalar(TypeTag::String));
        let data = map(json!({"_id": "abc", "title": "x"}));
        let out = validate_submitted_data(&data, &schema, &SubmitOptions::create());
        assert_eq!(out, data);
    }

    #[test]
    fn string_typed_primary_identifier_is_kept_on_clone() {
        let schema = Schema::new().field("_id", FieldSpec::scalar(TypeTag::String));
        let data = map(json!({"_id": "slug-1"}));
        let out = validate_submitted_data(&data, &schema, &SubmitOptions::clone_of());
        assert_eq!(out, data);
    }

    #[test]
    fn non_map_value_gives_empty_payload() {
        let out = validate_submitted_value(&Value::Int(3), &schema(), &SubmitOptions::update());
        assert!(out.is_empty());
    }
}
