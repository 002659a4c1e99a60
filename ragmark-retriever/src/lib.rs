//! ragmark-retriever: incremental indexing and context retrieval for a document corpus
//!
//! Documents are split into line chunks, embedded, and stored in SQLite next to a
//! full-text projection. At query time the nearest chunks are widened to a window
//! of their neighbours and handed to a prompt.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: The [`DocumentStore`](storage::DocumentStore) trait and its SQLite implementation
//! - **[`retrieval`]**: Document sources, the indexer, the context retriever and prompt assembly
//! - **[`config`]**: TOML configuration for the `ragmark` binary
//! - **[`error`]**: The [`RagError`](error::RagError) taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ragmark_embed::{EmbedConfig, OllamaProvider};
//! use ragmark_retriever::retrieval::{
//!     context::ContextRetriever, indexer::Indexer, source::DirectorySource,
//! };
//! use ragmark_retriever::storage::sqlite_store::SqliteStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(SqliteStore::open(Path::new(".ragmark.db")).await?);
//! let embedder = Arc::new(OllamaProvider::new(EmbedConfig::default())?);
//!
//! let report = Indexer::new(store.clone(), embedder.clone())
//!     .index(&DirectorySource::new("content"))
//!     .await?;
//! println!("{} documents reindexed", report.reindexed);
//!
//! let context = ContextRetriever::new(store, embedder)
//!     .get_context("How do I configure the server?")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! DocumentSource → Indexer → split → EmbeddingProvider → DocumentStore (SQLite)
//!                                                            ↓
//!               query → ContextRetriever → nearest chunks → windows → prompt
//! ```

pub mod config;
pub mod error;
pub mod retrieval;
pub mod storage;
