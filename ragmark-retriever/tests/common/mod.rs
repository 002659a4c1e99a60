//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use half::f16;
use ragmark_embed::{EmbedError, EmbeddingProvider, EmbeddingResult};
use ragmark_retriever::error::Result;
use ragmark_retriever::storage::sqlite_store::SqliteStore;
use ragmark_retriever::storage::{
    Chunk, ChunkIndex, Document, DocumentStore, FullTextEntry, FullTextMatch, NearestChunk,
    StoreStats,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DIMENSION: usize = 8;

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn vector(values: &[f32]) -> Vec<f16> {
    values.iter().copied().map(f16::from_f32).collect()
}

/// How the mock answers batch requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMode {
    Normal,
    /// Return one vector fewer than requested
    DropLast,
    /// Return a last vector one element longer than the others
    Ragged,
    /// Fail any request containing this text
    FailOn(String),
}

/// Deterministic in-process embedding provider that records its calls.
pub struct MockEmbedder {
    overrides: Mutex<HashMap<String, Vec<f16>>>,
    mode: Mutex<BatchMode>,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            overrides: Mutex::new(HashMap::new()),
            mode: Mutex::new(BatchMode::Normal),
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the vector returned for `text`.
    pub fn set_vector(&self, text: &str, values: &[f32]) {
        self.overrides
            .lock()
            .unwrap()
            .insert(text.to_string(), vector(values));
    }

    pub fn set_mode(&self, mode: BatchMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Bag-of-bytes vector, so identical texts embed identically.
    pub fn default_vector(text: &str) -> Vec<f16> {
        let mut values = [1.0f32; DIMENSION];
        for (position, byte) in text.bytes().enumerate() {
            values[byte as usize % DIMENSION] += 1.0 + (position % 3) as f32;
        }
        vector(&values)
    }

    fn vector_for(&self, text: &str) -> Vec<f16> {
        self.overrides
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| Self::default_vector(text))
    }

    fn check_failure(&self, texts: &[&str]) -> ragmark_embed::Result<()> {
        if let BatchMode::FailOn(poison) = &*self.mode.lock().unwrap() {
            if texts.iter().any(|t| t.contains(poison.as_str())) {
                return Err(EmbedError::invalid_response(format!(
                    "refusing to embed {poison}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed_text(&self, text: &str) -> ragmark_embed::Result<Vec<f16>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&[text])?;
        Ok(self.vector_for(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> ragmark_embed::Result<EmbeddingResult> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let borrowed: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.check_failure(&borrowed)?;

        let mut embeddings: Vec<Vec<f16>> = texts.iter().map(|t| self.vector_for(t)).collect();
        match &*self.mode.lock().unwrap() {
            BatchMode::DropLast => {
                embeddings.pop();
            }
            BatchMode::Ragged => {
                if let Some(last) = embeddings.last_mut() {
                    last.push(f16::ONE);
                }
            }
            BatchMode::Normal | BatchMode::FailOn(_) => {}
        }
        Ok(EmbeddingResult::new(embeddings))
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// A [`SqliteStore`] that counts the calls made through it.
pub struct CountingStore {
    inner: SqliteStore,
    calls: AtomicUsize,
    fulltext_writes: AtomicUsize,
    chunk_writes: AtomicUsize,
}

impl CountingStore {
    pub async fn open_memory() -> Result<Self> {
        Ok(Self {
            inner: SqliteStore::open_memory().await?,
            calls: AtomicUsize::new(0),
            fulltext_writes: AtomicUsize::new(0),
            chunk_writes: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fulltext_writes(&self) -> usize {
        self.fulltext_writes.load(Ordering::SeqCst)
    }

    pub fn chunk_writes(&self) -> usize {
        self.chunk_writes.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn upsert_document(&self, path: &str) -> Result<(Document, bool)> {
        self.record();
        self.inner.upsert_document(path).await
    }

    async fn select_document(&self, path: &str) -> Result<Option<Document>> {
        self.record();
        self.inner.select_document(path).await
    }

    async fn update_last_updated(&self, path: &str, last_updated: DateTime<Utc>) -> Result<()> {
        self.record();
        self.inner.update_last_updated(path, last_updated).await
    }

    async fn upsert_fulltext(&self, entry: &FullTextEntry) -> Result<()> {
        self.record();
        self.fulltext_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_fulltext(entry).await
    }

    async fn delete_chunks(&self, path: &str) -> Result<u64> {
        self.record();
        self.chunk_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_chunks(path).await
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        self.record();
        self.chunk_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_chunks(chunks).await
    }

    async fn replace_chunks(&self, path: &str, chunks: &[Chunk]) -> Result<()> {
        self.record();
        self.chunk_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_chunks(path, chunks).await
    }

    async fn select_chunks(&self, path: &str) -> Result<Vec<Chunk>> {
        self.record();
        self.inner.select_chunks(path).await
    }

    async fn select_chunk_range(
        &self,
        path: &str,
        start: ChunkIndex,
        end: ChunkIndex,
    ) -> Result<Vec<Chunk>> {
        self.record();
        self.inner.select_chunk_range(path, start, end).await
    }

    async fn select_nearest_chunks(
        &self,
        vector: &[f16],
        limit: usize,
    ) -> Result<Vec<NearestChunk>> {
        self.record();
        self.inner.select_nearest_chunks(vector, limit).await
    }

    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<FullTextMatch>> {
        self.record();
        self.inner.search_fulltext(query, limit).await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.record();
        self.inner.stats().await
    }
}

pub fn texts(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

pub fn indices(chunks: &[Chunk]) -> Vec<ChunkIndex> {
    chunks.iter().map(|c| c.index).collect()
}
