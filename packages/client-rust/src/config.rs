//! Client configuration.

use std::time::Duration;

/// Where the document API lives and how long requests may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:3000/api`.
    pub base_url: String,
    /// Maximum time to wait for a request to complete. No retries follow.
    pub request_timeout: Duration,
    /// Path (relative to `base_url`) serving `{ data: { type: schema } }`.
    pub schemas_path: String,
    /// Path (relative to `base_url`) under which `/{type}` and
    /// `/{type}/{id}` document routes live.
    pub documents_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout: Duration::from_secs(30),
            schemas_path: "schemas".to_string(),
            documents_path: "documents".to_string(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at another API root.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Joins `base_url` with path segments, normalizing slashes.
    #[must_use]
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for segment in segments {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.schemas_path, "schemas");
        assert_eq!(config.documents_path, "documents");
    }

    #[test]
    fn url_joins_segments() {
        let config = ClientConfig::with_base_url("http://host/api/");
        assert_eq!(config.url(&["documents", "event"]), "http://host/api/documents/event");
        assert_eq!(config.url(&["/schemas/"]), "http://host/api/schemas");
        assert_eq!(config.url(&["", "x"]), "http://host/api/x");
    }
}
