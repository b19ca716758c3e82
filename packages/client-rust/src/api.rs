//! HTTP access to the document API.
//!
//! Every successful response wraps its payload in a `{ "data": ... }`
//! envelope; [`DocumentClient`] unwraps it. Non-2xx responses become
//! [`ClientError::Status`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use formwork_core::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Document CRUD and schema retrieval.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Raw schema documents keyed by document type.
    async fn fetch_schemas(&self) -> Result<BTreeMap<String, serde_json::Value>, ClientError>;

    /// All documents of a type.
    async fn fetch_documents(&self, doc_type: &str) -> Result<Vec<Value>, ClientError>;

    /// Creates a document and returns it as stored.
    async fn create_document(
        &self,
        doc_type: &str,
        payload: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError>;

    /// Updates a document and returns it as stored.
    async fn update_document(
        &self,
        doc_type: &str,
        id: &str,
        payload: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError>;

    async fn delete_document(&self, doc_type: &str, id: &str) -> Result<(), ClientError>;
}

/// [`DocumentApi`] over HTTP via `reqwest`.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl DocumentClient {
    /// Creates a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn documents_url(&self, doc_type: &str, id: Option<&str>) -> String {
        let mut segments = vec![self.config.documents_path.as_str(), doc_type];
        if let Some(id) = id {
            segments.push(id);
        }
        self.config.url(&segments)
    }

    /// Sends a request and unwraps the response envelope. Empty bodies
    /// (e.g. `204 No Content`) yield JSON `null`.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        info!(url = %response.url(), status = status.as_u16(), "document api response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        let mut body: serde_json::Value = serde_json::from_slice(&bytes)?;
        body.get_mut("data")
            .map(serde_json::Value::take)
            .ok_or(ClientError::MissingEnvelope)
    }
}

#[async_trait]
impl DocumentApi for DocumentClient {
    async fn fetch_schemas(&self) -> Result<BTreeMap<String, serde_json::Value>, ClientError> {
        let url = self.config.url(&[self.config.schemas_path.as_str()]);
        match self.send(self.http.get(url)).await? {
            serde_json::Value::Object(entries) => Ok(entries.into_iter().collect()),
            _ => Err(ClientError::UnexpectedShape {
                expected: "an object of schemas",
            }),
        }
    }

    async fn fetch_documents(&self, doc_type: &str) -> Result<Vec<Value>, ClientError> {
        let url = self.documents_url(doc_type, None);
        match self.send(self.http.get(url)).await? {
            serde_json::Value::Array(items) => Ok(items.into_iter().map(Value::from).collect()),
            _ => Err(ClientError::UnexpectedShape {
                expected: "an array of documents",
            }),
        }
    }

    async fn create_document(
        &self,
        doc_type: &str,
        payload: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let url = self.documents_url(doc_type, None);
        let data = self.send(self.http.post(url).json(payload)).await?;
        Ok(Value::from(data))
    }

    async fn update_document(
        &self,
        doc_type: &str,
        id: &str,
        payload: &BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let url = self.documents_url(doc_type, Some(id));
        let data = self.send(self.http.put(url).json(payload)).await?;
        Ok(Value::from(data))
    }

    async fn delete_document(&self, doc_type: &str, id: &str) -> Result<(), ClientError> {
        let url = self.documents_url(doc_type, Some(id));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}
