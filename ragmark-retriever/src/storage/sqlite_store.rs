//! SQLite implementation of [`DocumentStore`].
//!
//! ## Database Schema
//!
//! ```sql
//! -- Documents tracked by the indexer
//! CREATE TABLE document (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     path TEXT UNIQUE NOT NULL,
//!     last_updated TIMESTAMP NOT NULL      -- processing time of the last index
//! );
//!
//! -- Keyword projection, one row per path
//! CREATE VIRTUAL TABLE document_fulltext USING fts5(path UNINDEXED, title, text, summary);
//!
//! -- One row per line of document text
//! CREATE TABLE chunk (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     path TEXT NOT NULL,
//!     chunk_index INTEGER NOT NULL,
//!     text TEXT NOT NULL,
//!     UNIQUE (path, chunk_index)
//! );
//!
//! -- Embedding keyed by the owning chunk's id
//! CREATE TABLE chunk_embedding (
//!     chunk_id INTEGER PRIMARY KEY REFERENCES chunk(id) ON DELETE CASCADE,
//!     dimension INTEGER NOT NULL,
//!     embedding BLOB NOT NULL              -- f16 array, native byte order
//! );
//! ```
//!
//! Every statement is `IF NOT EXISTS`, so opening an existing database is a no-op
//! for the schema.
//!
//! ## Vector Search
//!
//! Nearest-neighbour search is an exhaustive scan: every stored embedding with the
//! query's dimension is scored by cosine distance and the rows are stably sorted,
//! so equal distances keep chunk insertion order.
//!
//! ## SQLite Configuration
//!
//! - **WAL mode**: readers are not blocked by an in-progress sweep
//! - **Busy timeout**: concurrent writers wait instead of failing immediately
//! - **Foreign keys**: embeddings are removed with their chunk

use super::{
    Chunk, ChunkIndex, Document, DocumentStore, FullTextEntry, FullTextMatch, NearestChunk,
    StoreStats,
};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use half::f16;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS document (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT UNIQUE NOT NULL,
        last_updated TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS document_fulltext USING fts5(
        path UNINDEXED,
        title,
        text,
        summary
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chunk (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        CONSTRAINT unique_chunk UNIQUE (path, chunk_index)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chunk_embedding (
        chunk_id INTEGER PRIMARY KEY REFERENCES chunk(id) ON DELETE CASCADE,
        dimension INTEGER NOT NULL,
        embedding BLOB NOT NULL
    )
    "#,
];

const CHUNK_COLUMNS: &str = "c.path, c.chunk_index, c.text, e.dimension, e.embedding";

/// SQLite-backed document store. Cloning shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file at `path` and applies the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(RagError::storage("open"))?;
        tracing::info!("Opened index database at {}", path.display());
        Self::new_with_pool(pool).await
    }

    /// Opens a private in-memory database, for tests.
    ///
    /// The pool is pinned to a single connection because every SQLite in-memory
    /// connection is its own database.
    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(RagError::storage("open"))?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(RagError::storage("open"))?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(pool)
                .await
                .map_err(RagError::storage("create_tables"))?;
        }
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunk_path ON chunk(path, chunk_index)")
            .execute(pool)
            .await
            .map_err(RagError::storage("create_tables"))?;
        Ok(())
    }

    /// Get the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn delete_chunk_rows(conn: &mut SqliteConnection, path: &str) -> Result<u64> {
        sqlx::query(
            "DELETE FROM chunk_embedding WHERE chunk_id IN (SELECT id FROM chunk WHERE path = ?1)",
        )
        .bind(path)
        .execute(&mut *conn)
        .await
        .map_err(RagError::storage("delete_chunks"))?;

        let result = sqlx::query("DELETE FROM chunk WHERE path = ?1")
            .bind(path)
            .execute(&mut *conn)
            .await
            .map_err(RagError::storage("delete_chunks"))?;
        Ok(result.rows_affected())
    }

    async fn insert_chunk_rows(conn: &mut SqliteConnection, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            // The embedding row is keyed by the id this insert returns, never by
            // the connection's last insert rowid.
            let chunk_id: i64 = sqlx::query_scalar(
                "INSERT INTO chunk (path, chunk_index, text) VALUES (?1, ?2, ?3) RETURNING id",
            )
            .bind(&chunk.path)
            .bind(chunk.index)
            .bind(&chunk.text)
            .fetch_one(&mut *conn)
            .await
            .map_err(RagError::storage("insert_chunks"))?;

            if let Some(embedding) = &chunk.embedding {
                sqlx::query(
                    "INSERT INTO chunk_embedding (chunk_id, dimension, embedding) VALUES (?1, ?2, ?3)",
                )
                .bind(chunk_id)
                .bind(embedding.len() as i64)
                .bind(encode_embedding(embedding))
                .execute(&mut *conn)
                .await
                .map_err(RagError::storage("insert_chunks"))?;
            }
        }
        Ok(())
    }

    async fn count_rows(&self, table: &'static str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::storage("stats"))
    }

    fn chunk_from_row(row: &SqliteRow, operation: &'static str) -> Result<Chunk> {
        let path: String = row.try_get("path").map_err(RagError::storage(operation))?;
        let index: i64 = row
            .try_get("chunk_index")
            .map_err(RagError::storage(operation))?;
        let text: String = row.try_get("text").map_err(RagError::storage(operation))?;
        let dimension: Option<i64> = row
            .try_get("dimension")
            .map_err(RagError::storage(operation))?;
        let bytes: Option<Vec<u8>> = row
            .try_get("embedding")
            .map_err(RagError::storage(operation))?;

        let embedding = match (dimension, bytes) {
            (Some(dimension), Some(bytes)) => Some(decode_embedding(&bytes, dimension, operation)?),
            _ => None,
        };

        Ok(Chunk {
            path,
            index,
            text,
            embedding,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert_document(&self, path: &str) -> Result<(Document, bool)> {
        if let Some(document) = self.select_document(path).await? {
            return Ok((document, true));
        }

        // A concurrent caller may have inserted the same path since the read above;
        // the unique constraint turns our insert into a no-op and the re-read sees theirs.
        let result =
            sqlx::query("INSERT OR IGNORE INTO document (path, last_updated) VALUES (?1, ?2)")
                .bind(path)
                .bind(DateTime::<Utc>::UNIX_EPOCH)
                .execute(&self.pool)
                .await
                .map_err(RagError::storage("upsert_document"))?;

        let document = self
            .select_document(path)
            .await?
            .ok_or_else(|| RagError::storage("upsert_document")(sqlx::Error::RowNotFound))?;
        Ok((document, result.rows_affected() == 0))
    }

    async fn select_document(&self, path: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, (i64, String, DateTime<Utc>)>(
            "SELECT id, path, last_updated FROM document WHERE path = ?1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(RagError::storage("select_document"))?;

        Ok(row.map(|(id, path, last_updated)| Document {
            id,
            path,
            last_updated,
        }))
    }

    async fn update_last_updated(&self, path: &str, last_updated: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE document SET last_updated = ?1 WHERE path = ?2")
            .bind(last_updated)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(RagError::storage("update_last_updated"))?;
        if result.rows_affected() == 0 {
            tracing::debug!(path, "No document row to timestamp");
        }
        Ok(())
    }

    async fn upsert_fulltext(&self, entry: &FullTextEntry) -> Result<()> {
        // FTS5 tables have no unique constraints, so replace is delete + insert.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RagError::storage("upsert_fulltext"))?;

        sqlx::query("DELETE FROM document_fulltext WHERE path = ?1")
            .bind(&entry.path)
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage("upsert_fulltext"))?;

        sqlx::query(
            "INSERT INTO document_fulltext (path, title, text, summary) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&entry.path)
        .bind(&entry.title)
        .bind(&entry.text)
        .bind(&entry.summary)
        .execute(&mut *tx)
        .await
        .map_err(RagError::storage("upsert_fulltext"))?;

        tx.commit()
            .await
            .map_err(RagError::storage("upsert_fulltext"))?;
        Ok(())
    }

    async fn delete_chunks(&self, path: &str) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RagError::storage("delete_chunks"))?;
        let deleted = Self::delete_chunk_rows(&mut *tx, path).await?;
        tx.commit()
            .await
            .map_err(RagError::storage("delete_chunks"))?;
        Ok(deleted)
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RagError::storage("insert_chunks"))?;
        Self::insert_chunk_rows(&mut *tx, chunks).await?;
        tx.commit()
            .await
            .map_err(RagError::storage("insert_chunks"))?;
        Ok(())
    }

    async fn replace_chunks(&self, path: &str, chunks: &[Chunk]) -> Result<()> {
        if let Some(stray) = chunks.iter().find(|chunk| chunk.path != path) {
            return Err(RagError::validation(format!(
                "chunk for {} cannot replace chunks of {path}",
                stray.path
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RagError::storage("replace_chunks"))?;
        let deleted = Self::delete_chunk_rows(&mut *tx, path).await?;
        Self::insert_chunk_rows(&mut *tx, chunks).await?;
        tx.commit()
            .await
            .map_err(RagError::storage("replace_chunks"))?;

        tracing::debug!(
            path,
            deleted,
            inserted = chunks.len(),
            "Replaced document chunks"
        );
        Ok(())
    }

    async fn select_chunks(&self, path: &str) -> Result<Vec<Chunk>> {
        let query = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk c
             LEFT JOIN chunk_embedding e ON e.chunk_id = c.id
             WHERE c.path = ?1
             ORDER BY c.chunk_index"
        );
        let rows = sqlx::query(&query)
            .bind(path)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::storage("select_chunks"))?;

        rows.iter()
            .map(|row| Self::chunk_from_row(row, "select_chunks"))
            .collect()
    }

    async fn select_chunk_range(
        &self,
        path: &str,
        start: ChunkIndex,
        end: ChunkIndex,
    ) -> Result<Vec<Chunk>> {
        let query = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk c
             LEFT JOIN chunk_embedding e ON e.chunk_id = c.id
             WHERE c.path = ?1 AND c.chunk_index BETWEEN ?2 AND ?3
             ORDER BY c.chunk_index"
        );
        let rows = sqlx::query(&query)
            .bind(path)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::storage("select_chunk_range"))?;

        rows.iter()
            .map(|row| Self::chunk_from_row(row, "select_chunk_range"))
            .collect()
    }

    async fn select_nearest_chunks(
        &self,
        vector: &[f16],
        limit: usize,
    ) -> Result<Vec<NearestChunk>> {
        if limit == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk_embedding e
             INNER JOIN chunk c ON c.id = e.chunk_id
             WHERE e.dimension = ?1
             ORDER BY c.id"
        );
        let rows = sqlx::query(&query)
            .bind(vector.len() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::storage("select_nearest_chunks"))?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk = Self::chunk_from_row(row, "select_nearest_chunks")?;
            if let Some(embedding) = &chunk.embedding {
                let distance = cosine_distance(vector, embedding);
                scored.push(NearestChunk { chunk, distance });
            }
        }

        // Stable sort: equal distances stay in row order.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<FullTextMatch>> {
        let Some(match_expression) = fts_match_expression(query) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT path, title, summary,
                   snippet(document_fulltext, 2, '[', ']', '...', 12) AS snippet,
                   bm25(document_fulltext) AS score
            FROM document_fulltext
            WHERE document_fulltext MATCH ?1
            ORDER BY score
            LIMIT ?2
            "#,
        )
        .bind(match_expression)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage("search_fulltext"))?;

        rows.iter()
            .map(|row| {
                Ok(FullTextMatch {
                    path: row.try_get("path")?,
                    title: row.try_get("title")?,
                    summary: row.try_get("summary")?,
                    snippet: row.try_get("snippet")?,
                    rank: row.try_get("score")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(RagError::storage("search_fulltext"))
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            documents: self.count_rows("document").await?,
            fulltext_entries: self.count_rows("document_fulltext").await?,
            chunks: self.count_rows("chunk").await?,
            embeddings: self.count_rows("chunk_embedding").await?,
        })
    }
}

fn encode_embedding(embedding: &[f16]) -> Vec<u8> {
    bytemuck::cast_slice::<f16, u8>(embedding).to_vec()
}

fn decode_embedding(bytes: &[u8], dimension: i64, operation: &'static str) -> Result<Vec<f16>> {
    let expected = usize::try_from(dimension).ok().map(|d| d * 2);
    if expected != Some(bytes.len()) {
        return Err(RagError::Encoding {
            operation,
            message: format!(
                "embedding blob of {} bytes does not hold {dimension} values",
                bytes.len()
            ),
        });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| f16::from_ne_bytes([pair[0], pair[1]]))
        .collect())
}

/// Quote each whitespace-separated term so user text is never parsed as FTS5 syntax.
fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// `1 - cosine similarity`; a zero vector is treated as orthogonal to everything.
fn cosine_distance(a: &[f16], b: &[f16]) -> f32 {
    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot_product / (norm_a * norm_b)
    }
}
