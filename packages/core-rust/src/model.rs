//! Form model construction.
//!
//! [`build_model`] walks a [`Schema`] alongside optional initial and current
//! form data and produces one [`FieldDescriptor`] per field: the resolved
//! value, the widget it should render as, select options, numeric bounds,
//! and a structural [`Path`] that change handlers write through.
//!
//! # Value precedence
//!
//! For every top-level key the effective value is, in order:
//! 1. `initial_data[key]` when `use_initial_data` is set and the value is defined,
//! 2. `form_data[key]` when defined,
//! 3. the normalizer default for the field's type.
//!
//! # Change handling
//!
//! Descriptors never mutate data. [`FieldDescriptor::on_change`] and
//! [`Form::change`] return a copy of the data with one path replaced and
//! hand that copy to the caller's [`ChangeListener`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::clock::{coerce_date, ClockSource, DateKind, SystemClock};
use crate::config::{BooleanWidget, FormConfig, NumberWidget};
use crate::normalize::{resolve_default, resolve_schema_defaults, zero_value};
use crate::path::{get_at_path, set_at_path, Path};
use crate::schema::{FieldSpec, FieldType, Schema, TypeTag};
use crate::store::ReferenceData;
use crate::submit::{validate_submitted_value, SubmitOptions};
use crate::types::Value;

/// Receives the full form data after every change.
pub type ChangeListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Item keys tried, in order, when labelling a reference option.
const LABEL_KEYS: &[&str] = &["title", "name", "label"];

/// Item keys tried, in order, for a reference option's value.
const ID_KEYS: &[&str] = &["_id", "id"];

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Widget a field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Switch,
    Checkbox,
    Slider,
    NumberInput,
    Date,
    DateTimeLocal,
    Object,
    Array,
    ObjectArray,
    Json,
}

/// Normalized semantic type of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    String,
    Number,
    Int32,
    Decimal,
    Boolean,
    Date,
    DateTimeLocal,
    ObjectId,
    Object,
    Array,
    Mixed,
}

impl DataType {
    fn of(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Object(_) => DataType::Object,
            FieldType::Array(_) => DataType::Array,
            FieldType::Scalar(tag) => match tag {
                TypeTag::String => DataType::String,
                TypeTag::Number => DataType::Number,
                TypeTag::Int32 => DataType::Int32,
                TypeTag::Decimal => DataType::Decimal,
                TypeTag::Boolean => DataType::Boolean,
                TypeTag::Date => DataType::Date,
                TypeTag::DateTimeLocal => DataType::DateTimeLocal,
                TypeTag::ObjectId => DataType::ObjectId,
                TypeTag::Mixed | TypeTag::Unknown(_) => DataType::Mixed,
            },
        }
    }
}

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

/// Range and granularity of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// UI-ready description of one schema field for a specific data instance.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    /// Storage location of this field inside the owning form data.
    pub path: Path,
    pub value: Value,
    pub default_value: Value,
    pub field_type: FieldKind,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<NumericBounds>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Sub-fields of `Object`, `Array` and `ObjectArray` fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDescriptor>,
    #[serde(skip)]
    listener: Option<ChangeListener>,
}

impl FieldDescriptor {
    /// Returns a copy of `root` with this field's value replaced, and
    /// notifies the change listener with that copy.
    pub fn on_change(&self, root: &Value, new_value: Value) -> Value {
        let next = set_at_path(root, &self.path, new_value);
        if let Some(listener) = &self.listener {
            listener(&next);
        }
        next
    }

    /// Finds this descriptor or a descendant by path.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&FieldDescriptor> {
        if &self.path == path {
            return Some(self);
        }
        if !path.segments().starts_with(self.path.segments()) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("value", &self.value)
            .field("default_value", &self.default_value)
            .field("field_type", &self.field_type)
            .field("data_type", &self.data_type)
            .field("options", &self.options)
            .field("bounds", &self.bounds)
            .field("required", &self.required)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// BuildRequest
// ---------------------------------------------------------------------------

/// Inputs of a model build.
#[derive(Clone)]
pub struct BuildRequest {
    schema: Arc<Schema>,
    initial_data: Option<Value>,
    form_data: Option<Value>,
    use_initial_data: bool,
    reference_data: ReferenceData,
    config: FormConfig,
    clock: Arc<dyn ClockSource>,
    on_change: Option<ChangeListener>,
}

impl BuildRequest {
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            initial_data: None,
            form_data: None,
            use_initial_data: false,
            reference_data: ReferenceData::new(),
            config: FormConfig::default(),
            clock: Arc::new(SystemClock),
            on_change: None,
        }
    }

    /// Request for a raw JSON schema; `None` when the document is not an
    /// object.
    #[must_use]
    pub fn from_json_schema(raw: &serde_json::Value) -> Option<Self> {
        Schema::from_json(raw).map(Self::new)
    }

    /// Data of the document being edited.
    #[must_use]
    pub fn initial_data(mut self, data: Value) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Current, possibly edited, form data.
    #[must_use]
    pub fn form_data(mut self, data: Value) -> Self {
        self.form_data = Some(data);
        self
    }

    /// Prefer `initial_data` over `form_data`.
    #[must_use]
    pub fn use_initial_data(mut self, enabled: bool) -> Self {
        self.use_initial_data = enabled;
        self
    }

    #[must_use]
    pub fn reference_data(mut self, bag: ReferenceData) -> Self {
        self.reference_data = bag;
        self
    }

    #[must_use]
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn on_change(mut self, listener: ChangeListener) -> Self {
        self.on_change = Some(listener);
        self
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Effective raw value of a top-level key, before defaults.
    fn source_value(&self, key: &str) -> Option<&Value> {
        let initial = self
            .initial_data
            .as_ref()
            .filter(|_| self.use_initial_data)
            .and_then(|data| data.get(key))
            .filter(|v| v.is_defined());
        initial.or_else(|| {
            self.form_data
                .as_ref()
                .and_then(|data| data.get(key))
                .filter(|v| v.is_defined())
        })
    }
}

impl fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("schema", &self.schema)
            .field("initial_data", &self.initial_data)
            .field("form_data", &self.form_data)
            .field("use_initial_data", &self.use_initial_data)
            .field("reference_data", &self.reference_data)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Form / FormModel
// ---------------------------------------------------------------------------

/// The full field list plus the form-level change, submit and init
/// operations.
#[derive(Clone)]
pub struct Form {
    pub fields: Vec<FieldDescriptor>,
    data: Value,
    schema: Arc<Schema>,
    config: FormConfig,
    clock: Arc<dyn ClockSource>,
    listener: Option<ChangeListener>,
}

impl Form {
    /// Data the form was built with.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns a copy of the form data with `value` stored at `path` and
    /// notifies the listener.
    pub fn change(&self, path: &Path, value: Value) -> Value {
        let next = set_at_path(&self.data, path, value);
        self.notify(&next);
        next
    }

    /// Sanitized payload of the current data.
    #[must_use]
    pub fn submit(&self, is_cloned: bool, is_new: bool) -> BTreeMap<String, Value> {
        let options = SubmitOptions {
            is_cloned,
            is_new,
            id_field: self.config.id_field.clone(),
        };
        validate_submitted_value(&self.data, &self.schema, &options)
    }

    /// Fresh defaults for every schema field. The listener receives them.
    pub fn init(&self) -> Value {
        let fresh = resolve_schema_defaults(&self.schema, None, self.clock.as_ref());
        self.notify(&fresh);
        fresh
    }

    /// Descriptor at `path`, searching nested fields.
    #[must_use]
    pub fn field(&self, path: &Path) -> Option<&FieldDescriptor> {
        self.fields.iter().find_map(|field| field.find(path))
    }

    fn notify(&self, data: &Value) {
        if let Some(listener) = &self.listener {
            listener(data);
        }
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.fields)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Result of [`build_model`].
#[derive(Debug, Clone)]
pub struct FormModel {
    /// Descriptors keyed by top-level field name.
    pub model: BTreeMap<String, FieldDescriptor>,
    pub form: Form,
    /// Reconstructed value tree.
    pub data: Value,
}

// ---------------------------------------------------------------------------
// build_model
// ---------------------------------------------------------------------------

/// Builds the form model for `request`.
#[must_use]
pub fn build_model(request: &BuildRequest) -> FormModel {
    let sources: BTreeMap<String, Value> = request
        .schema
        .names()
        .filter_map(|name| request.source_value(name).map(|v| (name.to_string(), v.clone())))
        .collect();
    let root = Value::Map(sources);

    let builder = Builder {
        request,
        root: &root,
    };
    let fields: Vec<FieldDescriptor> = request
        .schema
        .iter()
        .map(|(name, spec)| builder.top_level(name, spec))
        .collect();

    let data = Value::Map(
        fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect(),
    );
    let model = fields
        .iter()
        .map(|field| (field.name.clone(), field.clone()))
        .collect();

    FormModel {
        model,
        form: Form {
            fields,
            data: data.clone(),
            schema: Arc::clone(&request.schema),
            config: request.config.clone(),
            clock: Arc::clone(&request.clock),
            listener: request.on_change.clone(),
        },
        data,
    }
}

/// Parses `raw` and builds its model with default settings. `None` when the
/// schema is not a JSON object.
#[must_use]
pub fn build_model_from_json(
    raw: &serde_json::Value,
    initial_data: Option<Value>,
    use_initial_data: bool,
) -> Option<FormModel> {
    let mut request = BuildRequest::from_json_schema(raw)?.use_initial_data(use_initial_data);
    if let Some(data) = initial_data {
        request = request.initial_data(data.clone()).form_data(data);
    }
    Some(build_model(&request))
}

struct Builder<'a> {
    request: &'a BuildRequest,
    /// Effective top-level values, used to resolve `refPath` targets.
    root: &'a Value,
}

impl Builder<'_> {
    fn clock(&self) -> &dyn ClockSource {
        self.request.clock.as_ref()
    }

    fn config(&self) -> &FormConfig {
        &self.request.config
    }

    fn top_level(&self, name: &str, spec: &FieldSpec) -> FieldDescriptor {
        let source = self.root.get(name);
        self.field(name, spec, Path::key(name), source, Some(self.root))
    }

    /// Builds a nested field, skipping specs the grammar could not classify.
    fn nested(
        &self,
        name: &str,
        spec: &FieldSpec,
        path: Path,
        source: Option<&Value>,
        parent: Option<&Value>,
    ) -> Option<FieldDescriptor> {
        if spec.field_type.is_unknown() {
            debug!(path = %path, "skipping nested field without a recognized type");
            return None;
        }
        Some(self.field(name, spec, path, source, parent))
    }

    fn field(
        &self,
        name: &str,
        spec: &FieldSpec,
        path: Path,
        source: Option<&Value>,
        parent: Option<&Value>,
    ) -> FieldDescriptor {
        let source = source.filter(|v| v.is_defined());
        let mut descriptor = FieldDescriptor {
            name: name.to_string(),
            path,
            value: Value::Null,
            default_value: Value::Null,
            field_type: FieldKind::Text,
            data_type: DataType::of(&spec.field_type),
            options: Vec::new(),
            bounds: None,
            required: spec.required,
            max_length: spec.max_length,
            children: Vec::new(),
            listener: self.request.on_change.clone(),
        };
        match &spec.field_type {
            FieldType::Object(schema) => self.object_field(&mut descriptor, spec, schema, source),
            FieldType::Array(element) => self.array_field(&mut descriptor, spec, element, source),
            FieldType::Scalar(tag) => self.scalar_field(&mut descriptor, spec, tag, source, parent),
        }
        descriptor
    }

    fn object_field(
        &self,
        descriptor: &mut FieldDescriptor,
        spec: &FieldSpec,
        schema: &Schema,
        source: Option<&Value>,
    ) {
        let source = source.filter(|v| matches!(v, Value::Map(_)));
        descriptor.field_type = FieldKind::Object;
        descriptor.children = schema
            .iter()
            .filter_map(|(key, child)| {
                let child_source = source.and_then(|s| s.get(key));
                self.nested(key, child, descriptor.path.child_key(key), child_source, source)
            })
            .collect();
        descriptor.value = Value::Map(
            descriptor
                .children
                .iter()
                .map(|child| (child.name.clone(), child.value.clone()))
                .collect(),
        );
        descriptor.default_value = resolve_default(&spec.field_type, None, self.clock());
    }

    fn array_field(
        &self,
        descriptor: &mut FieldDescriptor,
        spec: &FieldSpec,
        element: &FieldSpec,
        source: Option<&Value>,
    ) {
        descriptor.field_type = match element.field_type {
            FieldType::Object(_) => FieldKind::ObjectArray,
            _ => FieldKind::Array,
        };
        let items = match source {
            Some(Value::Array(items)) => items.clone(),
            _ => match resolve_default(&spec.field_type, None, self.clock()) {
                Value::Array(items) => items,
                _ => Vec::new(),
            },
        };
        descriptor.default_value = resolve_default(&spec.field_type, None, self.clock());

        if element.field_type.is_unknown() {
            debug!(path = %descriptor.path, "array elements have no recognized type");
            descriptor.value = Value::Array(items);
            return;
        }
        let array = Value::Array(items.clone());
        descriptor.children = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.field(
                    &index.to_string(),
                    element,
                    descriptor.path.child_index(index),
                    Some(item),
                    Some(&array),
                )
            })
            .collect();
        descriptor.value = Value::Array(
            descriptor
                .children
                .iter()
                .map(|child| child.value.clone())
                .collect(),
        );
    }

    fn scalar_field(
        &self,
        descriptor: &mut FieldDescriptor,
        spec: &FieldSpec,
        tag: &TypeTag,
        source: Option<&Value>,
        parent: Option<&Value>,
    ) {
        let zero = || zero_value(tag, self.clock());
        descriptor.default_value = spec.default.clone().unwrap_or_else(zero);

        match tag {
            TypeTag::String => {
                descriptor.value = source.cloned().unwrap_or_else(zero);
                if let Some(enum_spec) = &spec.enum_values {
                    descriptor.field_type = FieldKind::Select;
                    descriptor.options = enum_spec.values.iter().map(enum_option).collect();
                } else if spec
                    .max_length
                    .is_some_and(|max| max > self.config().textarea_threshold)
                {
                    descriptor.field_type = FieldKind::Textarea;
                } else {
                    descriptor.field_type = FieldKind::Text;
                }
            }
            TypeTag::ObjectId if spec.has_reference() => {
                descriptor.field_type = FieldKind::Select;
                descriptor.options = self.reference_options(spec, parent);
                descriptor.value = source.cloned().unwrap_or(Value::Null);
                descriptor.default_value = spec.default.clone().unwrap_or(Value::Null);
            }
            TypeTag::ObjectId => {
                descriptor.field_type = FieldKind::Text;
                descriptor.value = source.cloned().unwrap_or_else(zero);
            }
            TypeTag::Date | TypeTag::DateTimeLocal => {
                let kind = if *tag == TypeTag::Date {
                    DateKind::Date
                } else {
                    DateKind::DateTimeLocal
                };
                descriptor.field_type = match kind {
                    DateKind::Date => FieldKind::Date,
                    DateKind::DateTimeLocal => FieldKind::DateTimeLocal,
                };
                descriptor.default_value = self.declared_date(spec, kind);
                descriptor.value = match source {
                    Some(value) => coerce_date(value, kind),
                    None => descriptor.default_value.clone(),
                };
            }
            TypeTag::Number | TypeTag::Int32 | TypeTag::Decimal => {
                let config = self.config();
                descriptor.field_type = match config.number_widget {
                    NumberWidget::Slider => FieldKind::Slider,
                    NumberWidget::Input => FieldKind::NumberInput,
                };
                descriptor.bounds = Some(NumericBounds {
                    min: spec.min.unwrap_or(config.default_min),
                    max: spec.max.unwrap_or(config.default_max),
                    step: spec.step.unwrap_or(config.default_step),
                });
                descriptor.value = source.map_or_else(zero, coerce_number);
            }
            TypeTag::Boolean => {
                descriptor.field_type = match self.config().boolean_widget {
                    BooleanWidget::Switch => FieldKind::Switch,
                    BooleanWidget::Checkbox => FieldKind::Checkbox,
                };
                // Declared defaults do not seed booleans; only data does.
                descriptor.value = Value::Bool(source.is_some_and(Value::is_truthy));
            }
            TypeTag::Mixed => {
                descriptor.field_type = FieldKind::Json;
                descriptor.value = source.cloned().unwrap_or_else(zero);
            }
            TypeTag::Unknown(_) => {
                descriptor.field_type = FieldKind::Text;
                descriptor.value = source.cloned().unwrap_or_else(zero);
            }
        }
    }

    /// Resolves a declared date default: `now`/`today` mean the clock,
    /// other strings and epoch millis are re-formatted, and anything else
    /// falls back to the current date.
    fn declared_date(&self, spec: &FieldSpec, kind: DateKind) -> Value {
        let now = || Value::String(kind.format(self.clock().now()));
        match &spec.default {
            Some(Value::String(text))
                if matches!(
                    text.to_ascii_lowercase().as_str(),
                    "now" | "today" | "date.now"
                ) =>
            {
                now()
            }
            Some(declared @ (Value::String(_) | Value::Int(_))) => coerce_date(declared, kind),
            _ => now(),
        }
    }

    /// Options for an identifier field pointing at another collection.
    ///
    /// `ref` names the collection directly. `refPath` names a field whose
    /// value is the collection: it is read from the sibling data first, then
    /// from the document root. When that field is unset, every collection
    /// listed in its schema `enum` contributes options.
    fn reference_options(&self, spec: &FieldSpec, parent: Option<&Value>) -> Vec<SelectOption> {
        let collections: Vec<String> = if let Some(collection) = &spec.reference {
            vec![collection.clone()]
        } else if let Some(ref_path) = &spec.ref_path {
            self.ref_path_collections(ref_path, parent)
        } else {
            Vec::new()
        };

        let bag = &self.request.reference_data;
        collections
            .iter()
            .flat_map(|collection| bag.items(collection).iter().filter_map(reference_option))
            .collect()
    }

    fn ref_path_collections(&self, ref_path: &str, parent: Option<&Value>) -> Vec<String> {
        let named = ref_path.parse::<Path>().ok().and_then(|path| {
            parent
                .and_then(|p| get_at_path(p, &path))
                .or_else(|| get_at_path(self.root, &path))
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        });
        if let Some(name) = named {
            return vec![name];
        }
        self.request
            .schema
            .lookup(ref_path)
            .and_then(|target| target.enum_values.as_ref())
            .map(|enum_spec| {
                enum_spec
                    .values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn enum_option(value: &Value) -> SelectOption {
    SelectOption {
        value: value.clone(),
        label: display_label(value),
    }
}

fn reference_option(item: &Value) -> Option<SelectOption> {
    let id = ID_KEYS
        .iter()
        .find_map(|key| item.get(key).filter(|v| v.is_defined()))?;
    let label = LABEL_KEYS
        .iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .map_or_else(|| display_label(id), str::to_string);
    Some(SelectOption {
        value: id.clone(),
        label,
    })
}

fn display_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::Value::from(other.clone()).to_string(),
    }
}

/// Numeric strings become numbers; everything else is kept as given.
fn coerce_number(value: &Value) -> Value {
    match value {
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Value::Int)
                .or_else(|_| text.parse::<f64>().map(Value::Float))
                .unwrap_or_else(|_| value.clone())
        }
        other => other.clone(),
    }
}
