//! Integration tests for query-time context retrieval

mod common;

use anyhow::Result;
use common::{BatchMode, CountingStore, MockEmbedder, at, indices, texts, vector};
use ragmark_retriever::error::RagError;
use ragmark_retriever::retrieval::context::{ContextRetriever, RetrieverConfig};
use ragmark_retriever::retrieval::indexer::Indexer;
use ragmark_retriever::retrieval::prompt::build_chat_prompt;
use ragmark_retriever::retrieval::source::{SourceDocument, StaticSource};
use ragmark_retriever::storage::sqlite_store::SqliteStore;
use ragmark_retriever::storage::{Chunk, DocumentStore};
use std::sync::Arc;

/// Six chunks for `p.md`; chunk 2 is closest to [1, 0], chunk 3 next closest.
async fn six_chunk_store() -> Result<Arc<SqliteStore>> {
    let store = Arc::new(SqliteStore::open_memory().await?);
    let chunks: Vec<Chunk> = (0..6)
        .map(|index| {
            let embedding = match index {
                2 => vector(&[1.0, 0.0]),
                3 => vector(&[1.0, 0.25]),
                _ => vector(&[0.0, 1.0]),
            };
            Chunk::new("p.md", index, format!("line {index}")).with_embedding(embedding)
        })
        .collect();
    store.replace_chunks("p.md", &chunks).await?;
    Ok(store)
}

#[tokio::test]
async fn test_windows_are_flattened_and_deduplicated() -> Result<()> {
    let store = six_chunk_store().await?;
    let embedder = Arc::new(MockEmbedder::new());
    embedder.set_vector("where?", &[1.0, 0.0]);

    let config = RetrieverConfig::default()
        .with_nearest_limit(2)
        .with_context_window(1);
    let retriever = ContextRetriever::with_config(store, embedder.clone(), config);

    let context = retriever.get_context("where?").await?;
    assert_eq!(indices(&context), vec![1, 2, 3, 4]);
    assert_eq!(texts(&context), vec!["line 1", "line 2", "line 3", "line 4"]);
    assert_eq!(embedder.single_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_window_at_document_start_is_clamped() -> Result<()> {
    let store = six_chunk_store().await?;
    let embedder = Arc::new(MockEmbedder::new());
    embedder.set_vector("top", &[0.0, 1.0]);

    // Chunk 0 is the first of the equally distant chunks
    let config = RetrieverConfig::default()
        .with_nearest_limit(1)
        .with_context_window(10);
    let retriever = ContextRetriever::with_config(store, embedder, config);

    let context = retriever.get_context("top").await?;
    assert_eq!(indices(&context), vec![0, 1, 2, 3, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn test_same_index_in_different_documents_is_kept() -> Result<()> {
    let store = Arc::new(SqliteStore::open_memory().await?);
    store
        .replace_chunks(
            "a.md",
            &[Chunk::new("a.md", 0, "alpha").with_embedding(vector(&[1.0, 0.0]))],
        )
        .await?;
    store
        .replace_chunks(
            "b.md",
            &[Chunk::new("b.md", 0, "bravo").with_embedding(vector(&[1.0, 0.5]))],
        )
        .await?;

    let embedder = Arc::new(MockEmbedder::new());
    embedder.set_vector("q", &[1.0, 0.0]);
    let retriever = ContextRetriever::new(store, embedder);

    let context = retriever.get_context("q").await?;
    assert_eq!(texts(&context), vec!["alpha", "bravo"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_corpus_returns_no_context() -> Result<()> {
    let store = Arc::new(SqliteStore::open_memory().await?);
    let retriever = ContextRetriever::new(store, Arc::new(MockEmbedder::new()));

    let context = retriever.get_context("anything at all").await?;
    assert!(context.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_query_is_rejected_before_any_call() -> Result<()> {
    let store = Arc::new(CountingStore::open_memory().await?);
    let embedder = Arc::new(MockEmbedder::new());
    let retriever = ContextRetriever::new(store.clone(), embedder.clone());

    for query in ["", "   \n\t"] {
        let err = retriever.get_context(query).await.unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err}");
    }
    assert_eq!(embedder.single_calls(), 0);
    assert_eq!(store.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_embedding_failure_is_not_an_empty_context() -> Result<()> {
    let store = six_chunk_store().await?;
    let embedder = Arc::new(MockEmbedder::new());
    embedder.set_mode(BatchMode::FailOn("broken".to_string()));
    let retriever = ContextRetriever::new(store, embedder);

    let err = retriever.get_context("broken query").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
    Ok(())
}

#[tokio::test]
async fn test_indexed_corpus_answers_prompt() -> Result<()> {
    let store = Arc::new(SqliteStore::open_memory().await?);
    let embedder = Arc::new(MockEmbedder::new());

    let source = StaticSource::new(vec![
        SourceDocument::new(
            "install.md",
            at(2024, 1, 1),
            "Download the archive\nUnpack it into /opt\nAdd /opt/bin to PATH\n",
        ),
        SourceDocument::new("faq.md", at(2024, 1, 1), "Is it free?\nYes, MIT licensed.\n"),
    ]);
    Indexer::new(store.clone(), embedder.clone())
        .index(&source)
        .await?;

    let exact = ContextRetriever::with_config(
        store.clone(),
        embedder.clone(),
        RetrieverConfig::default()
            .with_nearest_limit(1)
            .with_context_window(0),
    );
    let context = exact.get_context("Unpack it into /opt").await?;
    assert_eq!(texts(&context), vec!["Unpack it into /opt"]);
    assert_eq!(context[0].path, "install.md");

    let windowed = ContextRetriever::with_config(
        store,
        embedder,
        RetrieverConfig::default()
            .with_nearest_limit(1)
            .with_context_window(1),
    );
    let context = windowed.get_context("Unpack it into /opt").await?;
    assert_eq!(indices(&context), vec![0, 1, 2]);

    let prompt = build_chat_prompt(&context, "Where does it go?");
    assert!(prompt.contains("Context from install.md:\nUnpack it into /opt\n\n"));
    assert!(prompt.ends_with("Question: Where does it go?\nSuccint Answer: "));
    Ok(())
}
