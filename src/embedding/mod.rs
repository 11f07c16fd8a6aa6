//! Embedding client abstraction and adapters.

mod openai;

pub use openai::OpenAiEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Length of every vector produced for a chunk.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce an embedding for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// HTTP layer failed before a usable response arrived.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Returned vector length does not match [`EMBEDDING_DIMENSION`].
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Required vector length.
        expected: usize,
        /// Length the provider returned.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce the embedding vector for one chunk of text.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Deterministic offline embedding client.
///
/// Bytes of the input are folded into vector slots and the result is L2-normalized, so equal
/// texts always map to equal vectors. Useful for local runs and tests.
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct a client producing [`EMBEDDING_DIMENSION`]-length vectors.
    pub const fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
        }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

impl Default for HashingEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no text provided".to_string(),
            ));
        }
        Ok(Self::encode(text, self.dimension))
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient + Send + Sync>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        "Building embedding client"
    );
    match config.embedding_provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbeddingClient::new())),
        EmbeddingProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("OPENAI_API_KEY is not set".to_string())
            })?;
            let client = OpenAiEmbeddingClient::new(
                api_key,
                &config.openai_base_url,
                &config.embedding_model,
            )?;
            Ok(Arc::new(client))
        }
    }
}
