//! Error types for indexing and retrieval

use ragmark_embed::EmbedError;

/// Result type used by the store, the indexer and the context retriever.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors raised by the indexing/retrieval pipeline.
///
/// Store and embedding failures carry the operation that produced them so a
/// sweep report or CLI message says what was being attempted.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Caller input was rejected before any I/O happened
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A read or write against the store failed
    #[error("Storage operation `{operation}` failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A stored value could not be decoded
    #[error("Corrupt stored value in `{operation}`: {message}")]
    Encoding {
        operation: &'static str,
        message: String,
    },

    /// The embedding capability failed
    #[error("Embedding failed: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// The embedding batch did not line up with the chunks submitted
    #[error("Embedding batch for {path} returned {actual} usable vectors for {expected} chunks")]
    PartialBatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// The document source could not produce a document
    #[error("Failed to read document {path}: {message}")]
    Source { path: String, message: String },
}

impl RagError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a sqlx error with the name of the store operation.
    pub fn storage(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Storage { operation, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_partial_batch(&self) -> bool {
        matches!(self, Self::PartialBatch { .. })
    }
}
