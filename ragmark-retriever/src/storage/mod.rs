//! Storage abstraction layer for ragmark-retriever
//!
//! This module defines the [`DocumentStore`] trait through which the indexer and the
//! context retriever read and write documents, chunks and the full-text projection.
//! The store is an injected collaborator: callers hold an `Arc<dyn DocumentStore>`,
//! which lets tests wrap or replace the SQLite implementation.
//!
//! ## Key Components
//!
//! - **DocumentStore**: Document, full-text and chunk operations
//! - **SqliteStore**: The SQLite implementation (see [`sqlite_store`])
//! - **Data Types**: Document, Chunk, FullTextEntry and search results
//!
//! ## Data Model
//!
//! ```text
//! document (path) ──owns──> chunk (path, index) ──1:1──> chunk_embedding
//!        └──────────────── document_fulltext (path)
//! ```
//!
//! A document's chunks are always replaced wholesale: after a reindex the chunk
//! indices for a path are exactly `0..N`, in chunker emission order.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use half::f16;

pub mod sqlite_store;

/// Position of a chunk within its document. Signed so that window arithmetic
/// around index 0 can go negative without wrapping.
pub type ChunkIndex = i64;

/// A tracked document and the processing time of its last successful index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub path: String,
    pub last_updated: DateTime<Utc>,
}

/// Keyword-searchable projection of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullTextEntry {
    pub path: String,
    pub title: String,
    pub text: String,
    pub summary: String,
}

/// A single retrievable line of a document, with its embedding when present.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub path: String,
    pub index: ChunkIndex,
    pub text: String,
    pub embedding: Option<Vec<f16>>,
}

impl Chunk {
    pub fn new<P: Into<String>, T: Into<String>>(path: P, index: ChunkIndex, text: T) -> Self {
        Self {
            path: path.into(),
            index,
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f16>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A chunk returned by nearest-neighbour search. Smaller distance is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// A keyword search hit over the full-text projection.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FullTextMatch {
    pub path: String,
    pub title: String,
    pub summary: String,
    pub snippet: String,
    /// bm25 rank; lower is a better match
    pub rank: f64,
}

/// Row counts for each table of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StoreStats {
    pub documents: i64,
    pub fulltext_entries: i64,
    pub chunks: i64,
    pub embeddings: i64,
}

/// Persistence operations for the indexing/retrieval pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the document for `path`, creating it with an epoch timestamp if absent.
    /// The flag is `true` when the row already existed.
    async fn upsert_document(&self, path: &str) -> Result<(Document, bool)>;

    /// Read the document for `path` without creating it.
    async fn select_document(&self, path: &str) -> Result<Option<Document>>;

    /// Set the last-updated time of an existing document. Absent paths are left absent.
    async fn update_last_updated(&self, path: &str, last_updated: DateTime<Utc>) -> Result<()>;

    /// Insert or replace the full-text entry keyed by its path.
    async fn upsert_fulltext(&self, entry: &FullTextEntry) -> Result<()>;

    /// Remove every chunk and embedding for `path`, returning the number of chunks removed.
    async fn delete_chunks(&self, path: &str) -> Result<u64>;

    /// Insert chunks and their embeddings exactly as given, in one transaction.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Delete the chunks for `path` and insert `chunks` in their place, in one transaction.
    async fn replace_chunks(&self, path: &str, chunks: &[Chunk]) -> Result<()>;

    /// All chunks for `path`, ascending by index.
    async fn select_chunks(&self, path: &str) -> Result<Vec<Chunk>>;

    /// Chunks for `path` with `start <= index <= end`, ascending by index.
    async fn select_chunk_range(
        &self,
        path: &str,
        start: ChunkIndex,
        end: ChunkIndex,
    ) -> Result<Vec<Chunk>>;

    /// Up to `limit` chunks across the corpus, nearest to `vector` first.
    async fn select_nearest_chunks(&self, vector: &[f16], limit: usize)
    -> Result<Vec<NearestChunk>>;

    /// Keyword search over titles, text and summaries, best match first.
    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<FullTextMatch>>;

    /// Row counts for the index tables.
    async fn stats(&self) -> Result<StoreStats>;
}
