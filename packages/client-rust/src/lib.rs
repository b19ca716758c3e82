//! `formwork` client: REST access to documents and schemas, with every
//! outgoing payload sanitized against its schema first.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod service;

pub use api::{DocumentApi, DocumentClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use service::{DocumentService, SyncReport};
