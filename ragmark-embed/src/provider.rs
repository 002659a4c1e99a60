//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f16 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector, or 0 when
    /// there are none.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Returns `true` if every vector has the same length as the first.
    pub fn is_uniform(&self) -> bool {
        self.embeddings.iter().all(|e| e.len() == self.dimension)
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// Implementations must preserve input order: the n-th vector of
/// [`embed_texts`](Self::embed_texts) belongs to the n-th input text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>>;

    /// Generate embeddings for multiple texts in one request
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Name of the model producing the embeddings
    fn model_name(&self) -> &str;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by an Ollama-compatible `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Validates the configuration and builds the HTTP client.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        tracing::info!(
            "Created embedding client for model {} at {}",
            config.model,
            config.base_url
        );
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    async fn request(&self, input: EmbedInput<'_>) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.config.model,
            input,
        };
        let response = self
            .client
            .post(self.config.embed_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Embedding server returned {}", status);
            return Err(EmbedError::Status { status, body: text });
        }

        let decoded: EmbedResponse = serde_json::from_str(&text)
            .map_err(|e| EmbedError::invalid_response(e.to_string()))?;
        Ok(decoded.embeddings)
    }

    fn convert_to_f16(embeddings: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
        embeddings
            .into_iter()
            .map(|embedding| embedding.into_iter().map(f16::from_f32).collect())
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let embeddings = self.request(EmbedInput::Single(text)).await?;
        let count = embeddings.len();
        Self::convert_to_f16(embeddings)
            .into_iter()
            .next()
            .filter(|_| count == 1)
            .ok_or_else(|| {
                EmbedError::invalid_response(format!("expected 1 embedding, got {count}"))
            })
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(Vec::new()));
        }
        tracing::debug!("Embedding batch of {} texts", texts.len());
        let embeddings = self.request(EmbedInput::Batch(texts)).await?;
        Ok(EmbeddingResult::new(Self::convert_to_f16(embeddings)))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
