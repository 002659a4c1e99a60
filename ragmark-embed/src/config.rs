//! Configuration for the embedding client

use crate::error::{EmbedError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Configuration for an embedding endpoint.
///
/// All fields have defaults, so a partial config table deserializes cleanly.
///
/// ```
/// use ragmark_embed::EmbedConfig;
///
/// let config = EmbedConfig::default().with_model("all-minilm");
/// assert_eq!(config.embed_url(), "http://127.0.0.1:11434/api/embed");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Base URL of the server, without the `/api/embed` suffix
    pub base_url: String,
    /// Name of the embedding model to request
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl EmbedConfig {
    /// Create a configuration for the given server and model.
    pub fn new<U: Into<String>, M: Into<String>>(base_url: U, model: M) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the batch embedding endpoint.
    pub fn embed_url(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    /// Validate the configuration before building a client.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(EmbedError::invalid_config("model name must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(EmbedError::invalid_config(format!(
                "base URL must use http or https: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(EmbedError::invalid_config("timeout must be at least one second"));
        }
        tracing::debug!("Embedding configuration validated for model {}", self.model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embed_url_strips_trailing_slash() {
        let config = EmbedConfig::new("http://localhost:11434/", "m");
        assert_eq!(config.embed_url(), "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_partial_deserialization() {
        let config: EmbedConfig = serde_json::from_str(r#"{"model": "all-minilm"}"#).unwrap();
        assert_eq!(config.model, "all-minilm");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validation_failures() {
        assert!(EmbedConfig::default().with_model(" ").validate().is_err());
        assert!(
            EmbedConfig::default()
                .with_base_url("localhost:11434")
                .validate()
                .is_err()
        );
        assert!(
            EmbedConfig::default()
                .with_timeout(Duration::from_millis(10))
                .validate()
                .is_err()
        );
    }
}
