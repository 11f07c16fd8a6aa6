//! Status and chunk persistence collaborators.
//!
//! The pipeline only talks to these traits. [`HttpBackend`] speaks to the storage API over JSON;
//! [`InMemoryBackend`] keeps everything in process for the command-line tool and tests.

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::{InMemoryBackend, StatusEntry, StoredChunk};

use crate::processing::StatusUpdate;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned while talking to the storage API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Base URL failed to parse or cannot carry path segments.
    #[error("Invalid storage API URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage API responded with an unexpected status code.
    #[error("Unexpected storage API response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the storage API.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// One chunk and its embedding, ready to be persisted.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRecord<'a> {
    /// Request the chunk belongs to.
    pub request_id: &'a str,
    /// Position of the chunk in the document.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: &'a str,
    /// Embedding computed for `text`.
    pub embedding: &'a [f32],
    /// RFC 3339 creation timestamp.
    pub created_at: &'a str,
}

/// Durable record of a request's processing status.
///
/// Reporting is a best-effort side channel: callers log failures and carry on.
#[async_trait]
pub trait StatusGateway: Send + Sync {
    /// Record a status transition for `request_id`.
    async fn report_status(
        &self,
        request_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), GatewayError>;
}

/// Durable store for chunk text and embeddings.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Persist one chunk. `Ok(false)` means the store declined the write.
    async fn store_chunk(&self, record: ChunkRecord<'_>) -> Result<bool, GatewayError>;
}
