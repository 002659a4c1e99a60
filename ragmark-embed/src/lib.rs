//! # ragmark-embed
//!
//! Async client for text embedding servers. The indexer and the context
//! retriever only see the [`EmbeddingProvider`] trait; [`OllamaProvider`] is the
//! concrete implementation that talks to an Ollama-compatible `/api/embed`
//! endpoint.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ragmark_embed::{EmbedConfig, EmbeddingProvider, OllamaProvider};
//!
//! # async fn example() -> ragmark_embed::Result<()> {
//! let provider = OllamaProvider::new(EmbedConfig::default())?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering and Failure
//!
//! A batch call returns one vector per input text, in input order, or fails as a
//! whole. Callers that need a strict one-to-one mapping should still compare
//! [`EmbeddingResult::len`] with the number of inputs.
//!
//! ## Memory Usage
//!
//! Vectors are converted to half precision (f16) on receipt, which halves the
//! size of the stored index.

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, OllamaProvider};
