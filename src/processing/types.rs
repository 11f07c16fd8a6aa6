//! Core data types and error definitions for the processing pipeline.

use crate::{
    embedding::EmbeddingClientError,
    extraction::ExtractionError,
    gateway::GatewayError,
    source::FetchError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning extracted text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Fatal errors: any of these ends the request with a `Failed` status.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Document bytes could not be retrieved from their remote location.
    #[error("Failed to fetch document: {0}")]
    Fetch(#[from] FetchError),
    /// Extraction step failed or produced no text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Blocking extraction task panicked or was cancelled.
    #[error("Extraction task aborted: {0}")]
    ExtractionTask(#[from] tokio::task::JoinError),
    /// Chunking step was misconfigured.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Chunker produced nothing from non-empty extracted text.
    #[error("No chunks were produced from the extracted text")]
    EmptyChunkSet,
}

/// Per-chunk failures. These are logged and counted, never propagated.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Embedding provider failed for this chunk.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Store call errored for this chunk.
    #[error("persistence failed: {0}")]
    Persistence(#[from] GatewayError),
    /// Store call completed but reported the write as unsuccessful.
    #[error("persistence rejected the chunk")]
    Rejected,
}

/// Bounded-length, ordered segment of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence, contiguous from zero.
    pub index: usize,
    /// Trimmed, non-empty chunk text.
    pub text: String,
}

/// Where the bytes for a document come from.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    /// Bytes already materialized in memory.
    Inline(Vec<u8>),
    /// Remote location that must be downloaded before extraction.
    Remote(String),
}

/// One file-processing request as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    /// Identifier the status and chunk records are keyed by.
    pub request_id: String,
    /// Display name of the document.
    pub file_name: String,
    /// Declared format tag, parsed during extraction.
    pub format_tag: String,
    /// Document bytes or their location.
    pub content: DocumentContent,
}

/// Counts reported for a request that made it past extraction and chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    /// Number of chunks produced for the document.
    pub chunks_created: usize,
    /// Number of chunks whose embedding was computed and stored.
    pub embeddings_created: usize,
}

/// Caller-facing summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProcessingReport {
    /// Extraction and chunking succeeded; counts describe the chunk loop.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Always `true`.
        success: bool,
        /// Number of chunks produced for the document.
        chunks_created: usize,
        /// Number of chunks embedded and stored.
        embeddings_created: usize,
    },
    /// A fatal stage failed.
    Failed {
        /// Always `false`.
        success: bool,
        /// Message of the error that ended the request.
        error: String,
    },
}

impl ProcessingReport {
    /// Whether the request made it past extraction and chunking.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl From<Result<ProcessingOutcome, ProcessingError>> for ProcessingReport {
    fn from(result: Result<ProcessingOutcome, ProcessingError>) -> Self {
        match result {
            Ok(outcome) => Self::Completed {
                success: true,
                chunks_created: outcome.chunks_created,
                embeddings_created: outcome.embeddings_created,
            },
            Err(error) => Self::Failed {
                success: false,
                error: error.to_string(),
            },
        }
    }
}
