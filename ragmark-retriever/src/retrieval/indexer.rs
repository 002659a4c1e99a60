//! Incremental indexing of a document corpus.
//!
//! The [`Indexer`] drives every document of a [`DocumentSource`] through the
//! per-document pipeline and writes the results through the [`DocumentStore`].
//!
//! ## Pipeline
//!
//! ```text
//! upsert document ─┬─> mtime <= last_updated ──> UpToDate
//!                  └─> stale ─> load ─> full-text ─> split ─> embed ─> replace chunks ─> timestamp
//! ```
//!
//! Staleness compares the source modification time against the processing time
//! recorded by the previous successful run. The two come from different clocks
//! and the comparison is kept as-is: a document modified between the read and
//! the timestamp update of a run is reindexed again on the next sweep.
//!
//! A failure aborts only the document it happened on. It is logged, recorded
//! in the [`SweepReport`], and the sweep moves on to the next document.

use super::source::{DocumentSource, SourceDocument, SourceEntry};
use crate::error::{RagError, Result};
use crate::storage::{Chunk, ChunkIndex, DocumentStore, FullTextEntry};
use chrono::{DateTime, Utc};
use ragmark_embed::EmbeddingProvider;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Terminal state of one document in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// The stored index is at least as new as the source; nothing was written.
    UpToDate,
    /// The document was reindexed and now has `chunks` chunks.
    Reindexed { chunks: usize },
}

/// A document the sweep could not index.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: String,
    pub error: RagError,
}

/// Summary of one pass over a document source.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub up_to_date: usize,
    pub reindexed: usize,
    pub chunks_written: usize,
    pub failures: Vec<DocumentFailure>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.up_to_date + self.reindexed + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, path: &str) -> Option<&DocumentFailure> {
        self.failures.iter().find(|f| f.path == path)
    }

    fn record(&mut self, path: &str, result: Result<DocumentOutcome>) {
        match result {
            Ok(DocumentOutcome::UpToDate) => self.up_to_date += 1,
            Ok(DocumentOutcome::Reindexed { chunks }) => {
                self.reindexed += 1;
                self.chunks_written += chunks;
            }
            Err(e) => {
                error!(path = %path, "Failed to index document: {}", e);
                self.failures.push(DocumentFailure {
                    path: path.to_string(),
                    error: e,
                });
            }
        }
    }
}

/// Indexes documents into a [`DocumentStore`], one document at a time.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: fn() -> DateTime<Utc>,
}

impl Indexer {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for the last-updated timestamp.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one sweep over `source`.
    ///
    /// Only a failure to list the source fails the sweep as a whole; every
    /// per-document failure ends up in [`SweepReport::failures`].
    pub async fn index(&self, source: &dyn DocumentSource) -> Result<SweepReport> {
        let entries = source.entries().await?;
        info!(
            "Starting sweep of {} documents with model {}",
            entries.len(),
            self.embedder.model_name()
        );

        let mut report = SweepReport::default();
        for entry in &entries {
            let result = self.index_entry(source, entry).await;
            report.record(&entry.path, result);
        }

        info!(
            "Sweep finished: {} reindexed, {} up to date, {} failed, {} chunks written",
            report.reindexed,
            report.up_to_date,
            report.failures.len(),
            report.chunks_written
        );
        Ok(report)
    }

    /// Index a single listed entry, loading its text only when it is stale.
    pub async fn index_entry(
        &self,
        source: &dyn DocumentSource,
        entry: &SourceEntry,
    ) -> Result<DocumentOutcome> {
        if !self.is_stale(&entry.path, entry.mtime).await? {
            return Ok(DocumentOutcome::UpToDate);
        }
        let document = source.load(entry).await?;
        self.reindex(&document).await
    }

    /// Index a document whose text is already in hand.
    pub async fn index_document(&self, document: &SourceDocument) -> Result<DocumentOutcome> {
        if !self.is_stale(&document.path, document.mtime).await? {
            return Ok(DocumentOutcome::UpToDate);
        }
        self.reindex(document).await
    }

    async fn is_stale(&self, path: &str, mtime: DateTime<Utc>) -> Result<bool> {
        let (stored, existed) = self.store.upsert_document(path).await?;
        if mtime <= stored.last_updated {
            debug!(path = %path, "Document is up to date");
            return Ok(false);
        }
        if !existed {
            debug!(path = %path, "New document");
        }
        Ok(true)
    }

    async fn reindex(&self, document: &SourceDocument) -> Result<DocumentOutcome> {
        let path = document.path.as_str();

        self.store
            .upsert_fulltext(&FullTextEntry {
                path: path.to_string(),
                title: document.title.clone(),
                text: document.text.clone(),
                summary: document.summary.clone(),
            })
            .await?;

        let lines = ragmark_context::split(&document.text);
        if lines.is_empty() {
            debug!(path = %path, "No chunks; clearing stored chunks");
            self.store.replace_chunks(path, &[]).await?;
            self.store.update_last_updated(path, (self.clock)()).await?;
            return Ok(DocumentOutcome::Reindexed { chunks: 0 });
        }

        let result = self.embedder.embed_texts(&lines).await?;
        if result.len() != lines.len() {
            return Err(RagError::PartialBatch {
                path: path.to_string(),
                expected: lines.len(),
                actual: result.len(),
            });
        }
        if !result.is_uniform() {
            let usable = result
                .embeddings
                .iter()
                .filter(|e| e.len() == result.dimension)
                .count();
            return Err(RagError::PartialBatch {
                path: path.to_string(),
                expected: lines.len(),
                actual: usable,
            });
        }

        let chunks: Vec<Chunk> = lines
            .into_iter()
            .zip(result.embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| {
                Chunk::new(path, index as ChunkIndex, text).with_embedding(embedding)
            })
            .collect();

        self.store.replace_chunks(path, &chunks).await?;
        self.store.update_last_updated(path, (self.clock)()).await?;

        info!(path = %path, count = chunks.len(), "Reindexed document");
        Ok(DocumentOutcome::Reindexed {
            chunks: chunks.len(),
        })
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("provider", &self.embedder.provider_name())
            .field("model", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}
