//! `formwork` core: schema grammar, default resolution, form models, and
//! submission payload sanitizing.
//!
//! Everything in this crate is synchronous and free of I/O. Schemas and
//! reference collections come in as parameters (see [`store`]).

pub mod clock;
pub mod config;
pub mod model;
pub mod normalize;
pub mod object_id;
pub mod path;
pub mod schema;
pub mod store;
pub mod submit;
pub mod types;

pub use clock::{ClockSource, FixedClock, SystemClock};
pub use config::{BooleanWidget, FormConfig, NumberWidget};
pub use model::{
    build_model, build_model_from_json, BuildRequest, ChangeListener, DataType, FieldDescriptor,
    FieldKind, Form, FormModel, NumericBounds, SelectOption,
};
pub use normalize::{resolve_default, resolve_schema_defaults};
pub use path::{get_at_path, set_at_path, Path, PathSegment};
pub use schema::{classify, EnumSpec, FieldSpec, FieldType, Schema, TypeTag};
pub use store::{MemoryStore, ReferenceData, SchemaSource};
pub use submit::{validate_submitted_data, validate_submitted_value, SubmitOptions};
pub use types::Value;
