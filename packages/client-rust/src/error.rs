//! Error type for the document API client and [`crate::DocumentService`].

/// Errors surfaced by the document client. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response body has no `data` envelope")]
    MissingEnvelope,
    #[error("expected {expected} in response data")]
    UnexpectedShape { expected: &'static str },
    #[error("no schema registered for document type {0:?}")]
    UnknownSchema(String),
    #[error("document has no valid {field:?} to update")]
    MissingId { field: String },
}
