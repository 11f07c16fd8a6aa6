//! Document processing pipeline: chunking, status tracking, and orchestration.

pub mod chunking;
mod service;
mod status;
pub mod types;

pub use chunking::chunk_text;
pub use service::{IngestionPipeline, ProcessingApi, SetupError};
pub use status::{ProcessingStatus, StatusUpdate};
pub use types::{
    Chunk, ChunkError, ChunkingError, DocumentContent, ProcessingError, ProcessingOutcome,
    ProcessingReport, ProcessingRequest,
};
