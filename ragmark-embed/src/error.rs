//! Error types for the embedding client

/// Result type for embedding operations.
///
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Embedding calls are all-or-nothing: any variant means no vectors were
/// produced for the request.
///
/// # Error Categories
///
/// - **Configuration Errors**: Invalid base URL, model name or timeout
/// - **Transport Errors**: The request never produced a response
/// - **Upstream Errors**: The server answered with a non-success status
/// - **Decoding Errors**: The response body did not match the expected shape
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when the client configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Transport-level failure talking to the embedding server
    #[error("Embedding request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The embedding server rejected the request
    #[error("Embedding server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response could not be decoded into embeddings
    #[error("Invalid embedding response: {message}")]
    InvalidResponse { message: String },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid response error with a custom message.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
