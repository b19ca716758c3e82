//! Declarative field schemas and their classification.
//!
//! Schemas arrive as Mongoose-style JSON documents where a field entry is a
//! bare type tag, an `{ "type": ..., <constraints> }` object, a one-element
//! array describing the element type, or a nested object of further fields.
//! [`classify`] turns any such node into a [`FieldSpec`] built on the closed
//! [`FieldType`] union; every later stage matches on that union instead of
//! re-inspecting JSON shapes.
//!
//! # Classification rules
//!
//! | raw node                                   | result                          |
//! |--------------------------------------------|---------------------------------|
//! | recognized tag string                      | `Scalar(tag)`                   |
//! | `"[Tag]"`, `"Array<Tag>"`, `"Array of Tag"`| `Array(Scalar(tag))`            |
//! | `"Array"`, `[]`                            | `Array(Scalar(Mixed))`          |
//! | JSON number                                | `Int32` if integral, else `Decimal` |
//! | JSON bool                                  | `Boolean`                       |
//! | `[x]`                                      | `Array(classify(x))`            |
//! | object with a `type` key                   | `classify(type)` + constraints  |
//! | object without a `type` key                | `Object(..)` of its entries     |
//! | `null`                                     | `Scalar(Mixed)`                 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Key naming a field's type inside a field entry.
const TYPE_KEY: &str = "type";

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Primitive type tag of a scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    String,
    Number,
    Int32,
    Decimal,
    Boolean,
    Date,
    DateTimeLocal,
    ObjectId,
    /// Untyped payload (`Object`, `Mixed`, `null`).
    Mixed,
    /// A tag the grammar does not recognize. Kept verbatim for diagnostics.
    Unknown(String),
}

impl TypeTag {
    /// Parses a tag name. Canonical names match exactly; aliases match
    /// case-insensitively. Returns `None` for array forms and unknown names.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let parsed = match tag {
            "String" => TypeTag::String,
            "Number" => TypeTag::Number,
            "Int32" => TypeTag::Int32,
            "Decimal" => TypeTag::Decimal,
            "Boolean" => TypeTag::Boolean,
            "Date" => TypeTag::Date,
            "DateTimeLocal" => TypeTag::DateTimeLocal,
            "ObjectId" => TypeTag::ObjectId,
            "Mixed" | "Object" => TypeTag::Mixed,
            _ => match tag.to_ascii_lowercase().as_str() {
                "string" | "text" => TypeTag::String,
                "number" => TypeTag::Number,
                "int" | "integer" | "int32" => TypeTag::Int32,
                "decimal" | "decimal128" | "float" | "double" => TypeTag::Decimal,
                "bool" | "boolean" => TypeTag::Boolean,
                "date" => TypeTag::Date,
                "datetime" | "datetimelocal" | "datetime-local" => TypeTag::DateTimeLocal,
                "objectid" | "id" => TypeTag::ObjectId,
                "mixed" | "object" => TypeTag::Mixed,
                _ => return None,
            },
        };
        Some(parsed)
    }

    /// Whether the tag is one of the numeric kinds.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeTag::Number | TypeTag::Int32 | TypeTag::Decimal)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::String => f.write_str("String"),
            TypeTag::Number => f.write_str("Number"),
            TypeTag::Int32 => f.write_str("Int32"),
            TypeTag::Decimal => f.write_str("Decimal"),
            TypeTag::Boolean => f.write_str("Boolean"),
            TypeTag::Date => f.write_str("Date"),
            TypeTag::DateTimeLocal => f.write_str("DateTimeLocal"),
            TypeTag::ObjectId => f.write_str("ObjectId"),
            TypeTag::Mixed => f.write_str("Mixed"),
            TypeTag::Unknown(tag) => write!(f, "Unknown({tag})"),
        }
    }
}

/// Splits typed-array tag strings (`[String]`, `Array<String>`,
/// `Array of String`) into their element tag.
fn typed_array_element(tag: &str) -> Option<&str> {
    let tag = tag.trim();
    if let Some(inner) = tag.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return Some(inner.trim());
    }
    if let Some(inner) = tag.strip_prefix("Array<").and_then(|t| t.strip_suffix('>')) {
        return Some(inner.trim());
    }
    tag.strip_prefix("Array of ").map(str::trim)
}

// ---------------------------------------------------------------------------
// FieldType / FieldSpec / Schema
// ---------------------------------------------------------------------------

/// Shape of a field: a scalar, an array of some element spec, or a nested
/// object of named fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(TypeTag),
    Array(Box<FieldSpec>),
    Object(Schema),
}

impl FieldType {
    /// The scalar tag, if this is a scalar field.
    #[must_use]
    pub fn tag(&self) -> Option<&TypeTag> {
        match self {
            FieldType::Scalar(tag) => Some(tag),
            _ => None,
        }
    }

    /// True for the identifier type.
    #[must_use]
    pub fn is_object_id(&self) -> bool {
        matches!(self, FieldType::Scalar(TypeTag::ObjectId))
    }

    /// True when the field is an unrecognized scalar, which nested builders
    /// skip.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldType::Scalar(TypeTag::Unknown(_)))
    }
}

/// Legal values of an enumerated field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumSpec {
    pub values: Vec<Value>,
    /// Validation message shown when a value falls outside `values`.
    pub message: Option<String>,
}

/// One field: its shape plus constraint metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    /// Declared `default`, kept verbatim.
    pub default: Option<Value>,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub enum_values: Option<EnumSpec>,
    /// Name of the related collection supplying select options.
    pub reference: Option<String>,
    /// Path of the field whose value names the related collection.
    pub ref_path: Option<String>,
}

impl FieldSpec {
    /// A spec with the given shape and no constraints.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            default: None,
            required: false,
            min: None,
            max: None,
            step: None,
            min_length: None,
            max_length: None,
            enum_values: None,
            reference: None,
            ref_path: None,
        }
    }

    #[must_use]
    pub fn scalar(tag: TypeTag) -> Self {
        Self::new(FieldType::Scalar(tag))
    }

    #[must_use]
    pub fn array_of(element: FieldSpec) -> Self {
        Self::new(FieldType::Array(Box::new(element)))
    }

    #[must_use]
    pub fn object(schema: Schema) -> Self {
        Self::new(FieldType::Object(schema))
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(EnumSpec {
            values,
            message: None,
        });
        self
    }

    #[must_use]
    pub fn with_reference(mut self, collection: impl Into<String>) -> Self {
        self.reference = Some(collection.into());
        self
    }

    #[must_use]
    pub fn with_ref_path(mut self, path: impl Into<String>) -> Self {
        self.ref_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Whether the field points at another collection.
    #[must_use]
    pub fn has_reference(&self) -> bool {
        self.reference.is_some() || self.ref_path.is_some()
    }
}

/// Ordered collection of named fields. Declaration order is the form order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw JSON schema document.
    ///
    /// Returns `None` when the document is not a JSON object, which callers
    /// treat as "nothing to build".
    #[must_use]
    pub fn from_json(raw: &serde_json::Value) -> Option<Self> {
        raw.as_object().map(parse_shape)
    }

    /// Appends a field, replacing any earlier field with the same name in
    /// place.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = spec;
        } else {
            self.fields.push((name, spec));
        }
    }

    /// Builder-style [`insert`](Schema::insert).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Resolves a dotted path (`location.lat`, `tasks.0.title`) to a spec,
    /// stepping into array element specs on numeric segments.
    #[must_use]
    pub fn lookup(&self, dotted: &str) -> Option<&FieldSpec> {
        let mut segments = dotted.split('.').filter(|s| !s.is_empty());
        let mut spec = self.get(segments.next()?)?;
        for segment in segments {
            spec = match &spec.field_type {
                FieldType::Object(schema) => schema.get(segment)?,
                FieldType::Array(element) if segment.parse::<usize>().is_ok() => element.as_ref(),
                FieldType::Array(element) => match &element.field_type {
                    FieldType::Object(schema) => schema.get(segment)?,
                    _ => return None,
                },
                FieldType::Scalar(_) => return None,
            };
        }
        Some(spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Classifies one raw schema node into a [`FieldSpec`].
///
/// Never fails: nodes the grammar cannot place become
/// `Scalar(Unknown(..))` (for strings) or `Scalar(Mixed)`.
#[must_use]
pub fn classify(raw: &serde_json::Value) -> FieldSpec {
    match raw {
        serde_json::Value::String(tag) => FieldSpec::new(classify_tag(tag)),
        serde_json::Value::Number(n) => {
            let integral = n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0);
            FieldSpec::scalar(if integral {
                TypeTag::Int32
            } else {
                TypeTag::Decimal
            })
        }
        serde_json::Value::Bool(_) => FieldSpec::scalar(TypeTag::Boolean),
        serde_json::Value::Array(items) => match items.first() {
            Some(element) => FieldSpec::array_of(classify(element)),
            None => FieldSpec::array_of(FieldSpec::scalar(TypeTag::Mixed)),
        },
        serde_json::Value::Object(entries) => match entries.get(TYPE_KEY) {
            Some(type_node) if !is_nested_field_named_type(type_node) => {
                let mut spec = classify(type_node);
                apply_constraints(&mut spec, entries);
                spec
            }
            _ => FieldSpec::object(parse_shape(entries)),
        },
        serde_json::Value::Null => FieldSpec::scalar(TypeTag::Mixed),
    }
}

fn classify_tag(tag: &str) -> FieldType {
    if let Some(element) = typed_array_element(tag) {
        return FieldType::Array(Box::new(FieldSpec::new(classify_tag(element))));
    }
    if tag.trim().eq_ignore_ascii_case("array") {
        return FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::Mixed)));
    }
    FieldType::Scalar(TypeTag::parse(tag).unwrap_or_else(|| TypeTag::Unknown(tag.to_string())))
}

/// A nested field literally named `type` looks like `{ "type": { "type": "String" } }`;
/// such a node describes a shape, not a type.
fn is_nested_field_named_type(node: &serde_json::Value) -> bool {
    node.as_object()
        .is_some_and(|inner| inner.contains_key(TYPE_KEY) && inner.len() > 1)
}

fn parse_shape(entries: &serde_json::Map<String, serde_json::Value>) -> Schema {
    let mut schema = Schema::new();
    for (name, node) in entries {
        schema.insert(name.clone(), classify(node));
    }
    schema
}

fn apply_constraints(spec: &mut FieldSpec, entries: &serde_json::Map<String, serde_json::Value>) {
    for (key, node) in entries {
        match key.as_str() {
            "default" => spec.default = Some(Value::from(node.clone())),
            "required" => spec.required = required_flag(node),
            "min" => spec.min = node.as_f64(),
            "max" => spec.max = node.as_f64(),
            "step" => spec.step = node.as_f64(),
            "minLength" | "minlength" => spec.min_length = node.as_u64(),
            "maxLength" | "maxlength" => spec.max_length = node.as_u64(),
            "enum" => spec.enum_values = parse_enum(node),
            "ref" => spec.reference = node.as_str().map(str::to_string),
            "refPath" => spec.ref_path = node.as_str().map(str::to_string),
            _ => {}
        }
    }
}

/// `required` may be a bool or a `[bool, message]` pair.
fn required_flag(node: &serde_json::Value) -> bool {
    match node {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Array(items) => items.first().and_then(serde_json::Value::as_bool) == Some(true),
        _ => false,
    }
}

fn parse_enum(node: &serde_json::Value) -> Option<EnumSpec> {
    match node {
        serde_json::Value::Array(items) => Some(EnumSpec {
            values: items.iter().cloned().map(Value::from).collect(),
            message: None,
        }),
        serde_json::Value::Object(entries) => {
            let values = entries.get("values")?.as_array()?;
            Some(EnumSpec {
                values: values.iter().cloned().map(Value::from).collect(),
                message: entries
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_canonical_tags() {
        assert_eq!(classify(&json!("String")).field_type, FieldType::Scalar(TypeTag::String));
        assert_eq!(classify(&json!("Int32")).field_type, FieldType::Scalar(TypeTag::Int32));
        assert_eq!(
            classify(&json!("DateTimeLocal")).field_type,
            FieldType::Scalar(TypeTag::DateTimeLocal)
        );
        assert_eq!(classify(&json!("Object")).field_type, FieldType::Scalar(TypeTag::Mixed));
    }

    #[test]
    fn classifies_aliases_case_insensitively() {
        assert_eq!(classify(&json!("integer")).field_type, FieldType::Scalar(TypeTag::Int32));
        assert_eq!(classify(&json!("Decimal128")).field_type, FieldType::Scalar(TypeTag::Decimal));
        assert_eq!(classify(&json!("objectID")).field_type, FieldType::Scalar(TypeTag::ObjectId));
        assert_eq!(
            classify(&json!("datetime-local")).field_type,
            FieldType::Scalar(TypeTag::DateTimeLocal)
        );
    }

    #[test]
    fn unknown_tag_is_kept_verbatim() {
        assert_eq!(
            classify(&json!("Widget")).field_type,
            FieldType::Scalar(TypeTag::Unknown("Widget".to_string()))
        );
    }

    #[test]
    fn typed_array_tags() {
        let expected = FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::String)));
        assert_eq!(classify(&json!("[String]")).field_type, expected);
        assert_eq!(classify(&json!("Array<String>")).field_type, expected);
        assert_eq!(classify(&json!("Array of String")).field_type, expected);
        assert_eq!(
            classify(&json!({"type": "[Number]"})).field_type,
            FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::Number)))
        );
    }

    #[test]
    fn numbers_passed_as_tags_infer_integer_or_decimal() {
        assert_eq!(classify(&json!(3)).field_type, FieldType::Scalar(TypeTag::Int32));
        assert_eq!(classify(&json!(3.0)).field_type, FieldType::Scalar(TypeTag::Int32));
        assert_eq!(classify(&json!(3.25)).field_type, FieldType::Scalar(TypeTag::Decimal));
        assert_eq!(classify(&json!(true)).field_type, FieldType::Scalar(TypeTag::Boolean));
    }

    #[test]
    fn array_nodes_describe_their_element() {
        let spec = classify(&json!([{"type": "String", "maxLength": 20}]));
        let FieldType::Array(element) = spec.field_type else {
            panic!("expected array");
        };
        assert_eq!(element.field_type, FieldType::Scalar(TypeTag::String));
        assert_eq!(element.max_length, Some(20));

        let empty = classify(&json!([]));
        assert_eq!(
            empty.field_type,
            FieldType::Array(Box::new(FieldSpec::scalar(TypeTag::Mixed)))
        );
    }

    #[test]
    fn objects_without_type_are_nested_shapes() {
        let spec = classify(&json!({"lat": {"type": "Number"}, "lng": {"type": "Number"}}));
        let FieldType::Object(schema) = spec.field_type else {
            panic!("expected object");
        };
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["lat", "lng"]);
    }

    #[test]
    fn field_named_type_is_a_nested_field() {
        let spec = classify(&json!({
            "type": {"type": "String", "enum": ["a", "b"]},
            "label": {"type": "String"}
        }));
        let FieldType::Object(schema) = spec.field_type else {
            panic!("expected object");
        };
        assert!(schema.get("type").is_some_and(|s| s.enum_values.is_some()));
    }

    #[test]
    fn constraints_are_parsed() {
        let spec = classify(&json!({
            "type": "Number", "min": 1, "max": 10, "step": 0.5,
            "required": [true, "needed"], "default": 4
        }));
        assert_eq!(spec.min, Some(1.0));
        assert_eq!(spec.max, Some(10.0));
        assert_eq!(spec.step, Some(0.5));
        assert!(spec.required);
        assert_eq!(spec.default, Some(Value::Int(4)));
    }

    #[test]
    fn enum_with_message() {
        let spec = classify(&json!({
            "type": "String",
            "enum": {"values": ["low", "high"], "message": "bad priority"}
        }));
        let enum_values = spec.enum_values.expect("enum");
        assert_eq!(enum_values.values, vec![Value::from("low"), Value::from("high")]);
        assert_eq!(enum_values.message.as_deref(), Some("bad priority"));
    }

    #[test]
    fn references_are_parsed() {
        let spec = classify(&json!({"type": "ObjectId", "ref": "Calendar"}));
        assert_eq!(spec.reference.as_deref(), Some("Calendar"));
        assert!(spec.has_reference());
        let spec = classify(&json!({"type": "ObjectId", "refPath": "kind"}));
        assert_eq!(spec.ref_path.as_deref(), Some("kind"));
    }

    #[test]
    fn schema_from_non_object_is_none() {
        assert!(Schema::from_json(&json!([1, 2])).is_none());
        assert!(Schema::from_json(&json!("String")).is_none());
    }

    #[test]
    fn schema_keeps_declaration_order() {
        let schema = Schema::from_json(&json!({
            "zeta": "String", "alpha": "Number", "mid": "Boolean"
        }))
        .expect("object");
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let schema = Schema::from_json(&json!({
            "location": {"lat": {"type": "Number"}},
            "tasks": [{"title": {"type": "String"}}]
        }))
        .expect("object");
        assert!(schema.lookup("location.lat").is_some());
        assert!(schema.lookup("tasks.0.title").is_some());
        assert!(schema.lookup("tasks.title").is_some());
        assert!(schema.lookup("location.nope").is_none());
        assert!(schema.lookup("").is_none());
    }

    #[test]
    fn builders_match_parsed_specs() {
        let built = FieldSpec::scalar(TypeTag::Number)
            .with_bounds(1.0, 10.0)
            .with_default(4_i64);
        let parsed = classify(&json!({"type": "Number", "min": 1, "max": 10, "default": 4}));
        assert_eq!(built, parsed);
        assert!(built.field_type.tag().is_some_and(TypeTag::is_numeric));

        let select = FieldSpec::scalar(TypeTag::String)
            .with_enum(vec![Value::from("a")])
            .with_max_length(8);
        assert_eq!(
            select,
            classify(&json!({"type": "String", "enum": ["a"], "maxLength": 8}))
        );

        let target = FieldSpec::scalar(TypeTag::ObjectId).with_ref_path("kind");
        assert!(target.has_reference());
        assert!(target.field_type.is_object_id());
        assert!(FieldSpec::array_of(target).field_type.tag().is_none());
    }

    #[test]
    fn insert_replaces_in_place() {
        let schema = Schema::new()
            .field("a", FieldSpec::scalar(TypeTag::String))
            .field("b", FieldSpec::scalar(TypeTag::String))
            .field("a", FieldSpec::scalar(TypeTag::Boolean));
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            schema.get("a").map(|s| &s.field_type),
            Some(&FieldType::Scalar(TypeTag::Boolean))
        );
    }
}
