//! Embeds a few sentences against a running Ollama server.
//!
//! Run with: cargo run -p ragmark-embed --example simple_embedding

use ragmark_embed::{EmbedConfig, EmbeddingProvider, OllamaProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let provider = OllamaProvider::new(EmbedConfig::default())?;
    println!("Model: {}", provider.config().model);
    println!("Endpoint: {}", provider.config().embed_url());

    let text = "Hello, this is a test sentence for embedding generation.";
    let embedding = provider.embed_text(text).await?;
    println!("\"{text}\" -> {} dimensions", embedding.len());
    println!("First 5 values: {:?}", &embedding[..5.min(embedding.len())]);

    let texts = vec![
        "Hugo builds static sites from markdown.".to_string(),
        "SQLite stores the chunk index.".to_string(),
        "Nearest chunks become prompt context.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;
    println!(
        "Generated {} embeddings of dimension {}",
        result.len(),
        result.dimension
    );
    for (text, embedding) in texts.iter().zip(result.embeddings.iter()) {
        println!("  \"{text}\": {:?}", &embedding[..3.min(embedding.len())]);
    }

    Ok(())
}
