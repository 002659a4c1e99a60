//! Query-time context assembly.
//!
//! [`ContextRetriever::get_context`] embeds the query, takes the nearest chunks
//! across the corpus, and widens every hit to a symmetric window of
//! neighbouring chunks from the same document. Windows are flattened in
//! nearest-first order and deduplicated by `(path, index)`: the first
//! occurrence of a chunk fixes its position.

use crate::error::{RagError, Result};
use crate::storage::{Chunk, ChunkIndex, DocumentStore};
use ragmark_embed::EmbeddingProvider;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Default number of nearest chunks taken per query.
pub const DEFAULT_NEAREST_LIMIT: usize = 10;
/// Default number of neighbouring chunks fetched on each side of a hit.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Tuning for context retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub nearest_limit: usize,
    pub context_window: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            nearest_limit: DEFAULT_NEAREST_LIMIT,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl RetrieverConfig {
    pub fn with_nearest_limit(mut self, nearest_limit: usize) -> Self {
        self.nearest_limit = nearest_limit;
        self
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }
}

/// Assembles query-relevant context from the store.
#[derive(Clone)]
pub struct ContextRetriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrieverConfig,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(store, embedder, RetrieverConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve the windowed, deduplicated chunks relevant to `query`.
    ///
    /// An empty or whitespace-only query is rejected before any embedding or
    /// store call. An empty corpus yields an empty sequence.
    pub async fn get_context(&self, query: &str) -> Result<Vec<Chunk>> {
        if query.trim().is_empty() {
            return Err(RagError::validation("query must not be empty"));
        }

        let vector = self.embedder.embed_text(query).await?;
        let hits = self
            .store
            .select_nearest_chunks(&vector, self.config.nearest_limit)
            .await?;
        debug!(count = hits.len(), "Nearest chunks selected");

        let window = self.config.context_window as ChunkIndex;
        let mut seen: HashSet<(String, ChunkIndex)> = HashSet::new();
        let mut context = Vec::new();
        for hit in hits {
            let index = hit.chunk.index;
            debug!(path = %hit.chunk.path, index, distance = hit.distance, "Expanding hit");
            let neighbours = self
                .store
                .select_chunk_range(
                    &hit.chunk.path,
                    index.saturating_sub(window),
                    index.saturating_add(window),
                )
                .await?;
            for chunk in neighbours {
                if seen.insert((chunk.path.clone(), chunk.index)) {
                    context.push(chunk);
                }
            }
        }

        debug!(count = context.len(), "Context assembled");
        Ok(context)
    }
}

impl std::fmt::Debug for ContextRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRetriever")
            .field("model", &self.embedder.model_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
