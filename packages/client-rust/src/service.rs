//! Schema-aware document operations.
//!
//! [`DocumentService`] runs every outgoing payload through the submission
//! validator and keeps a [`MemoryStore`] of schemas and reference
//! collections in step with the API.

use std::collections::BTreeMap;
use std::sync::Arc;

use formwork_core::{
    object_id, validate_submitted_data, MemoryStore, Schema, SchemaSource, SubmitOptions, Value,
};
use tracing::{debug, info};

use crate::api::DocumentApi;
use crate::error::ClientError;

/// Counts reported by [`DocumentService::sync_store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub schemas: usize,
    pub collections: usize,
}

pub struct DocumentService<A: DocumentApi> {
    api: A,
    store: Arc<MemoryStore>,
    id_field: String,
}

impl<A: DocumentApi> DocumentService<A> {
    #[must_use]
    pub fn new(api: A, store: Arc<MemoryStore>) -> Self {
        Self {
            api,
            store,
            id_field: "_id".to_string(),
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetches all schemas and registers the object-shaped ones.
    ///
    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the API.
    pub async fn sync_schemas(&self) -> Result<usize, ClientError> {
        let schemas = self.api.fetch_schemas().await?;
        let registered = schemas
            .iter()
            .filter(|(doc_type, raw)| self.store.register_schema_json(doc_type.as_str(), raw))
            .count();
        info!(registered, fetched = schemas.len(), "schemas synced");
        Ok(registered)
    }

    /// Loads the documents of `doc_type` as reference collection
    /// `collection`. Returns the number of items.
    ///
    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the API.
    pub async fn sync_collection(&self, doc_type: &str, collection: &str) -> Result<usize, ClientError> {
        let items = self.api.fetch_documents(doc_type).await?;
        let count = items.len();
        self.store.set_reference_data(collection, items);
        debug!(doc_type, collection, count, "reference collection synced");
        Ok(count)
    }

    /// Syncs all schemas, then each named collection from the document
    /// type of the same name.
    ///
    /// # Errors
    ///
    /// Stops at the first failing request.
    pub async fn sync_store<'a>(
        &self,
        collections: impl IntoIterator<Item = &'a str>,
    ) -> Result<SyncReport, ClientError> {
        let mut report = SyncReport {
            schemas: self.sync_schemas().await?,
            collections: 0,
        };
        for collection in collections {
            self.sync_collection(collection, collection).await?;
            report.collections += 1;
        }
        Ok(report)
    }

    fn schema(&self, doc_type: &str) -> Result<Arc<Schema>, ClientError> {
        self.store
            .get_schema(doc_type)
            .ok_or_else(|| ClientError::UnknownSchema(doc_type.to_string()))
    }

    fn sanitize(
        &self,
        doc_type: &str,
        data: &BTreeMap<String, Value>,
        options: SubmitOptions,
    ) -> Result<BTreeMap<String, Value>, ClientError> {
        let schema = self.schema(doc_type)?;
        Ok(validate_submitted_data(
            data,
            &schema,
            &options.with_id_field(self.id_field.clone()),
        ))
    }

    /// Creates a new document. A primary identifier the schema declares as
    /// `ObjectId` is never sent.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownSchema`] when `doc_type` has no registered
    /// schema, or any API error.
    pub async fn create(
        &self,
        doc_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let payload = self.sanitize(doc_type, data, SubmitOptions::create())?;
        self.api.create_document(doc_type, &payload).await
    }

    /// Saves a copy of an existing document as a new one.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentService::create`].
    pub async fn clone_document(
        &self,
        doc_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let payload = self.sanitize(doc_type, data, SubmitOptions::clone_of())?;
        self.api.create_document(doc_type, &payload).await
    }

    /// Updates an existing document, addressed by its primary identifier.
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingId`] when `data` carries no valid identifier,
    /// [`ClientError::UnknownSchema`], or any API error.
    pub async fn update(
        &self,
        doc_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let id = data
            .get(&self.id_field)
            .filter(|id| object_id::is_valid(id))
            .and_then(id_segment)
            .ok_or_else(|| ClientError::MissingId {
                field: self.id_field.clone(),
            })?;
        let payload = self.sanitize(doc_type, data, SubmitOptions::update())?;
        self.api.update_document(doc_type, &id, &payload).await
    }

    /// # Errors
    ///
    /// Any API error.
    pub async fn delete(&self, doc_type: &str, id: &str) -> Result<(), ClientError> {
        self.api.delete_document(doc_type, id).await
    }
}

/// URL segment for a valid identifier value.
fn id_segment(id: &Value) -> Option<String> {
    match id {
        Value::String(text) => Some(text.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Float(f) => Some(format!("{f:.0}")),
        _ => None,
    }
}
