//! Read-only access to schemas and reference collections.
//!
//! The builder never reaches into a global store: callers hand it a
//! [`ReferenceData`] bag, usually assembled from a [`SchemaSource`].

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::schema::Schema;
use crate::types::Value;

/// Source of schemas per document type and of reference collections.
pub trait SchemaSource: Send + Sync {
    /// Schema registered for a document type (`event`, `planner`, ...).
    fn get_schema(&self, doc_type: &str) -> Option<Arc<Schema>>;

    /// Items of a named collection, each carrying `_id` and a label field.
    fn get_reference_data(&self, collection: &str) -> Option<Arc<Vec<Value>>>;
}

/// Collection name to items, used to populate identifier select options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    collections: BTreeMap<String, Vec<Value>>,
}

impl ReferenceData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: impl Into<String>, items: Vec<Value>) {
        self.collections.insert(collection.into(), items);
    }

    #[must_use]
    pub fn with(mut self, collection: impl Into<String>, items: Vec<Value>) -> Self {
        self.insert(collection, items);
        self
    }

    /// Items of a collection; empty when unknown.
    #[must_use]
    pub fn items(&self, collection: &str) -> &[Value] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Builds a bag from a JSON object of `collection -> [items]`. Entries
    /// that are not arrays are ignored.
    #[must_use]
    pub fn from_json(raw: &serde_json::Value) -> Self {
        let mut bag = Self::new();
        if let Some(entries) = raw.as_object() {
            for (name, items) in entries {
                if let Some(items) = items.as_array() {
                    bag.insert(name.clone(), items.iter().cloned().map(Value::from).collect());
                }
            }
        }
        bag
    }
}

/// In-memory [`SchemaSource`] backed by [`DashMap`] so it can be shared
/// between a fetching task and rendering code without external locking.
#[derive(Default)]
pub struct MemoryStore {
    schemas: DashMap<String, Arc<Schema>>,
    collections: DashMap<String, Arc<Vec<Value>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous one for the type.
    pub fn register_schema(&self, doc_type: impl Into<String>, schema: Schema) {
        self.schemas.insert(doc_type.into(), Arc::new(schema));
    }

    /// Parses and registers a raw JSON schema. Returns `false` (and
    /// registers nothing) when the document is not an object.
    pub fn register_schema_json(&self, doc_type: impl Into<String>, raw: &serde_json::Value) -> bool {
        let doc_type = doc_type.into();
        match Schema::from_json(raw) {
            Some(schema) => {
                self.register_schema(doc_type, schema);
                true
            }
            None => {
                debug!(doc_type = %doc_type, "ignoring non-object schema document");
                false
            }
        }
    }

    /// Replaces the items of a reference collection.
    pub fn set_reference_data(&self, collection: impl Into<String>, items: Vec<Value>) {
        self.collections.insert(collection.into(), Arc::new(items));
    }

    /// Registered document types, sorted.
    #[must_use]
    pub fn schema_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Snapshot of the named collections as a [`ReferenceData`] bag.
    /// Unknown names are skipped.
    #[must_use]
    pub fn reference_bag<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> ReferenceData {
        let mut bag = ReferenceData::new();
        for name in names {
            if let Some(items) = self.get_reference_data(name) {
                bag.insert(name, items.as_ref().clone());
            }
        }
        bag
    }
}

impl SchemaSource for MemoryStore {
    fn get_schema(&self, doc_type: &str) -> Option<Arc<Schema>> {
        self.schemas.get(doc_type).map(|e| Arc::clone(e.value()))
    }

    fn get_reference_data(&self, collection: &str) -> Option<Arc<Vec<Value>>> {
        self.collections.get(collection).map(|e| Arc::clone(e.value()))
    }
}
