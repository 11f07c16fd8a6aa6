use super::{EMBEDDING_DIMENSION, EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Embedding client for the OpenAI `/embeddings` endpoint (or a compatible server).
pub struct OpenAiEmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Create a client targeting `{base_url}/embeddings`.
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
    ) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder().user_agent("docembed/0.1").build()?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        tracing::debug!(endpoint = %endpoint, model, "Initialized OpenAI embedding client");
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingResponse = response.json().await?;
        let embedding = payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("provider returned no vectors".to_string())
            })?;

        if embedding.len() != EMBEDDING_DIMENSION {
            return Err(EmbeddingClientError::DimensionMismatch {
                expected: EMBEDDING_DIMENSION,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}
