use super::{ChunkRecord, ChunkStore, GatewayError, StatusGateway};
use crate::processing::{ProcessingStatus, StatusUpdate};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Status transition captured by [`InMemoryBackend`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    /// Request the transition belongs to.
    pub request_id: String,
    /// Reported status.
    pub status: ProcessingStatus,
    /// Metadata attached to the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Error message attached to the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Chunk captured by [`InMemoryBackend`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChunk {
    /// Request the chunk belongs to.
    pub request_id: String,
    /// Position of the chunk in the document.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: String,
    /// Stored embedding.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Process-local status and chunk store.
#[derive(Default)]
pub struct InMemoryBackend {
    statuses: Mutex<Vec<StatusEntry>>,
    chunks: Mutex<Vec<StoredChunk>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status transitions in the order they were reported.
    pub async fn statuses(&self) -> Vec<StatusEntry> {
        self.statuses.lock().await.clone()
    }

    /// Stored chunks in the order they were written.
    pub async fn chunks(&self) -> Vec<StoredChunk> {
        self.chunks.lock().await.clone()
    }
}

#[async_trait]
impl StatusGateway for InMemoryBackend {
    async fn report_status(
        &self,
        request_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), GatewayError> {
        self.statuses.lock().await.push(StatusEntry {
            request_id: request_id.to_string(),
            status: update.status,
            metadata: update.metadata.clone(),
            error_message: update.error_message.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for InMemoryBackend {
    async fn store_chunk(&self, record: ChunkRecord<'_>) -> Result<bool, GatewayError> {
        self.chunks.lock().await.push(StoredChunk {
            request_id: record.request_id.to_string(),
            chunk_index: record.chunk_index,
            text: record.text.to_string(),
            embedding: record.embedding.to_vec(),
            created_at: record.created_at.to_string(),
        });
        Ok(true)
    }
}
