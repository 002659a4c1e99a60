//! File-based configuration for the `ragmark` binary.
//!
//! ```toml
//! [embed]
//! base_url = "http://127.0.0.1:11434"
//! model = "nomic-embed-text"
//! timeout_secs = 60
//!
//! [retrieval]
//! nearest_limit = 10
//! context_window = 10
//!
//! [database]
//! path = ".ragmark.db"
//! ```
//!
//! Every field is optional and falls back to its default.

use crate::retrieval::context::RetrieverConfig;
use ragmark_embed::EmbedConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = ".ragmark.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embed: EmbedConfig,
    pub retrieval: RetrieverConfig,
    pub database: DatabaseConfig,
}

/// Errors reading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl RagConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragmark_embed::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RagConfig::from_toml_str("").unwrap();
        assert_eq!(config.embed.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.embed.model, DEFAULT_MODEL);
        assert_eq!(config.retrieval, RetrieverConfig::default());
        assert_eq!(config.database.path, PathBuf::from(".ragmark.db"));
    }

    #[test]
    fn test_partial_sections() {
        let config = RagConfig::from_toml_str(
            r#"
            [embed]
            model = "mxbai-embed-large"

            [retrieval]
            context_window = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.embed.model, "mxbai-embed-large");
        assert_eq!(config.embed.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retrieval.context_window, 2);
        assert_eq!(config.retrieval.nearest_limit, 10);
    }

    #[test]
    fn test_load_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ragmark.toml");
        std::fs::write(&path, "[retrieval]\nnearest_limit = \"many\"\n").unwrap();

        let err = RagConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("ragmark.toml"));

        let missing = RagConfig::load(&temp_dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
