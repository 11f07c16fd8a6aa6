//! Pipeline orchestrator: extraction, chunking, per-chunk embedding and persistence.

use crate::{
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, get_embedding_client},
    extraction::{self, ExtractionMetadata, ExtractionResult},
    gateway::{ChunkRecord, ChunkStore, GatewayError, HttpBackend, StatusGateway},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::chunk_text,
        status::{StatusTracker, StatusUpdate},
        types::{
            Chunk, ChunkError, DocumentContent, ProcessingError, ProcessingOutcome,
            ProcessingRequest,
        },
    },
    source::{DocumentFetcher, FetchError, HttpDocumentFetcher},
    timestamp::current_timestamp_rfc3339,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring the pipeline's collaborators at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Embedding client could not be built.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Storage API client could not be built.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Document downloader could not be built.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Runs one file-processing request from bytes to persisted chunks.
///
/// Each request is handled start to finish: a `Processing` status, then extraction and
/// chunking (either failing ends the request with `Failed`), then every chunk in index order
/// is embedded and stored. A failing chunk is logged and skipped; the request still ends
/// `Ready` with counts describing how many chunks made it.
///
/// The pipeline holds no per-request state, so one instance is shared across concurrent
/// requests through an `Arc`.
pub struct IngestionPipeline {
    embedding_client: Arc<dyn EmbeddingClient + Send + Sync>,
    status_gateway: Arc<dyn StatusGateway>,
    chunk_store: Arc<dyn ChunkStore>,
    fetcher: Arc<dyn DocumentFetcher>,
    metrics: Arc<PipelineMetrics>,
    max_chunk_size: usize,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Run the full pipeline for one request.
    async fn process(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingOutcome, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadyMetadata<'a> {
    #[serde(flatten)]
    extraction: &'a ExtractionMetadata,
    completed_at: String,
    total_chunks: usize,
    successful_embeddings: usize,
}

impl IngestionPipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient + Send + Sync>,
        status_gateway: Arc<dyn StatusGateway>,
        chunk_store: Arc<dyn ChunkStore>,
        fetcher: Arc<dyn DocumentFetcher>,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            embedding_client,
            status_gateway,
            chunk_store,
            fetcher,
            metrics: Arc::new(PipelineMetrics::new()),
            max_chunk_size,
        }
    }

    /// Build the production pipeline: configured embedder, HTTP storage API, HTTP downloads.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = get_embedding_client(config)?;
        let backend = Arc::new(HttpBackend::new(config)?);
        let fetcher = Arc::new(HttpDocumentFetcher::new(
            config.document_fetch_token.clone(),
        )?);
        tracing::info!(
            max_chunk_size = config.max_chunk_size,
            "Processing pipeline initialized"
        );

        Ok(Self::new(
            embedding_client,
            backend.clone(),
            backend,
            fetcher,
            config.max_chunk_size,
        ))
    }

    /// Run the pipeline for one request.
    pub async fn process(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let ProcessingRequest {
            request_id,
            file_name,
            format_tag,
            content,
        } = request;
        tracing::info!(
            request_id,
            file_name,
            format = format_tag,
            "Processing document"
        );

        let mut tracker = StatusTracker::new(self.status_gateway.as_ref(), &request_id);
        tracker.transition(StatusUpdate::processing()).await;

        let (extraction, chunks) = match self.prepare(&file_name, &format_tag, content).await {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::error!(request_id, error = %error, "Document processing failed");
                let message = error.to_string();
                let metadata = json!({
                    "error": message,
                    "failedAt": current_timestamp_rfc3339(),
                });
                tracker
                    .transition(StatusUpdate::failed(message, Some(metadata)))
                    .await;
                self.metrics.record_failure();
                return Err(error);
            }
        };

        let embeddings_created = self.embed_and_store(&request_id, &chunks).await;
        let outcome = ProcessingOutcome {
            chunks_created: chunks.len(),
            embeddings_created,
        };

        let metadata = ready_metadata(&extraction.metadata, outcome);
        tracker.transition(StatusUpdate::ready(metadata)).await;
        self.metrics.record_document(outcome);
        tracing::info!(
            request_id,
            chunks = outcome.chunks_created,
            embeddings = outcome.embeddings_created,
            "Document processed"
        );

        Ok(outcome)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Materialize bytes, extract text and chunk it. Any error here is fatal.
    async fn prepare(
        &self,
        file_name: &str,
        format_tag: &str,
        content: DocumentContent,
    ) -> Result<(ExtractionResult, Vec<Chunk>), ProcessingError> {
        let bytes = match content {
            DocumentContent::Inline(bytes) => bytes,
            DocumentContent::Remote(url) => self.fetcher.fetch(&url).await?,
        };

        let format_tag = format_tag.to_string();
        let file_name = file_name.to_string();
        let extraction = tokio::task::spawn_blocking(move || {
            extraction::extract(&bytes, &format_tag, &file_name)
        })
        .await??;

        let chunks = chunk_text(&extraction.text, self.max_chunk_size)?;
        if chunks.is_empty() {
            return Err(ProcessingError::EmptyChunkSet);
        }
        tracing::debug!(
            chunks = chunks.len(),
            max_chunk_size = self.max_chunk_size,
            "Chunked extracted text"
        );

        Ok((extraction, chunks))
    }

    /// Embed and persist every chunk in order. Returns how many succeeded.
    async fn embed_and_store(&self, request_id: &str, chunks: &[Chunk]) -> usize {
        let mut stored = 0;
        for chunk in chunks {
            match self.embed_and_store_chunk(request_id, chunk).await {
                Ok(()) => stored += 1,
                Err(error) => {
                    self.metrics.record_chunk_failure();
                    tracing::warn!(
                        request_id,
                        chunk_index = chunk.index,
                        error = %error,
                        "Skipping chunk"
                    );
                }
            }
        }
        stored
    }

    async fn embed_and_store_chunk(&self, request_id: &str, chunk: &Chunk) -> Result<(), ChunkError> {
        let embedding = self.embedding_client.generate_embedding(&chunk.text).await?;
        let created_at = current_timestamp_rfc3339();
        let record = ChunkRecord {
            request_id,
            chunk_index: chunk.index,
            text: &chunk.text,
            embedding: &embedding,
            created_at: &created_at,
        };

        if self.chunk_store.store_chunk(record).await? {
            Ok(())
        } else {
            Err(ChunkError::Rejected)
        }
    }
}

fn ready_metadata(extraction: &ExtractionMetadata, outcome: ProcessingOutcome) -> Option<Value> {
    let metadata = ReadyMetadata {
        extraction,
        completed_at: current_timestamp_rfc3339(),
        total_chunks: outcome.chunks_created,
        successful_embeddings: outcome.embeddings_created,
    };
    match serde_json::to_value(metadata) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(error = %error, "Failed to serialize status metadata");
            None
        }
    }
}

#[async_trait]
impl ProcessingApi for IngestionPipeline {
    async fn process(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        IngestionPipeline::process(self, request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IngestionPipeline::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EMBEDDING_DIMENSION, HashingEmbeddingClient};
    use crate::gateway::InMemoryBackend;
    use crate::processing::ProcessingStatus;
    use std::collections::HashSet;

    /// Embeds normally except for texts containing a marker.
    struct FlakyEmbedder {
        fail_marker: &'static str,
    }

    #[async_trait]
    impl EmbeddingClient for FlakyEmbedder {
        async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
            if text.contains(self.fail_marker) {
                return Err(EmbeddingClientError::GenerationFailed("provider down".into()));
            }
            Ok(vec![0.5; EMBEDDING_DIMENSION])
        }
    }

    /// Store that declines specific chunk indices.
    struct SelectiveStore {
        inner: InMemoryBackend,
        rejected: HashSet<usize>,
    }

    #[async_trait]
    impl ChunkStore for SelectiveStore {
        async fn store_chunk(&self, record: ChunkRecord<'_>) -> Result<bool, GatewayError> {
            if self.rejected.contains(&record.chunk_index) {
                return Ok(false);
            }
            self.inner.store_chunk(record).await
        }
    }

    struct NoFetcher;

    #[async_trait]
    impl DocumentFetcher for NoFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::UnexpectedStatus {
                status: reqwest::StatusCode::NOT_FOUND,
                url: url.to_string(),
            })
        }
    }

    fn pipeline_with(
        embedder: Arc<dyn EmbeddingClient + Send + Sync>,
        backend: Arc<InMemoryBackend>,
        store: Arc<dyn ChunkStore>,
        max_chunk_size: usize,
    ) -> IngestionPipeline {
        IngestionPipeline::new(embedder, backend, store, Arc::new(NoFetcher), max_chunk_size)
    }

    fn powerpoint_request(id: &str) -> ProcessingRequest {
        ProcessingRequest {
            request_id: id.to_string(),
            file_name: "deck.pptx".to_string(),
            format_tag: "powerpoint".to_string(),
            content: DocumentContent::Inline(Vec::new()),
        }
    }

    #[tokio::test]
    async fn placeholder_document_reaches_ready() {
        let backend = Arc::new(InMemoryBackend::new());
        let pipeline = pipeline_with(
            Arc::new(HashingEmbeddingClient::new()),
            backend.clone(),
            backend.clone(),
            1000,
        );

        let outcome = pipeline.process(powerpoint_request("req-1")).await.unwrap();
        assert_eq!(outcome.chunks_created, outcome.embeddings_created);
        assert!(outcome.chunks_created >= 1);

        let statuses = backend.statuses().await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].status, ProcessingStatus::Processing);
        assert_eq!(statuses[1].status, ProcessingStatus::Ready);
        let metadata = statuses[1].metadata.as_ref().unwrap();
        assert_eq!(metadata["format"], "powerpoint");
        assert_eq!(metadata["totalChunks"], outcome.chunks_created);
        assert_eq!(metadata["successfulEmbeddings"], outcome.embeddings_created);
        assert!(metadata.get("completedAt").is_some());

        let chunks = backend.chunks().await;
        let indices: Vec<_> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
        assert_eq!(indices, (0..outcome.chunks_created).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| c.embedding.len() == EMBEDDING_DIMENSION));
    }

    #[tokio::test]
    async fn failing_chunk_is_skipped_and_request_stays_ready() {
        let backend = Arc::new(InMemoryBackend::new());
        // The placeholder text splits into sentences; force each into its own chunk.
        let pipeline = pipeline_with(
            Arc::new(FlakyEmbedder {
                fail_marker: "Slide content",
            }),
            backend.clone(),
            backend.clone(),
            1,
        );

        let outcome = pipeline.process(powerpoint_request("req-2")).await.unwrap();
        assert!(outcome.chunks_created >= 2);
        assert_eq!(outcome.embeddings_created, outcome.chunks_created - 1);

        let statuses = backend.statuses().await;
        assert_eq!(statuses.last().unwrap().status, ProcessingStatus::Ready);
        assert_eq!(pipeline.metrics_snapshot().chunk_failures, 1);
    }

    #[tokio::test]
    async fn rejected_write_is_not_counted() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(SelectiveStore {
            inner: InMemoryBackend::new(),
            rejected: HashSet::from([0]),
        });
        let pipeline = pipeline_with(
            Arc::new(HashingEmbeddingClient::new()),
            backend.clone(),
            store,
            1,
        );

        let outcome = pipeline.process(powerpoint_request("req-3")).await.unwrap();
        assert_eq!(outcome.embeddings_created, outcome.chunks_created - 1);
    }

    #[tokio::test]
    async fn unsupported_format_fails_request() {
        let backend = Arc::new(InMemoryBackend::new());
        let pipeline = pipeline_with(
            Arc::new(HashingEmbeddingClient::new()),
            backend.clone(),
            backend.clone(),
            1000,
        );
        let mut request = powerpoint_request("req-4");
        request.format_tag = "keynote".to_string();

        let error = pipeline.process(request).await.unwrap_err();
        assert!(matches!(error, ProcessingError::Extraction(_)));

        let statuses = backend.statuses().await;
        assert_eq!(statuses.len(), 2);
        let terminal = &statuses[1];
        assert_eq!(terminal.status, ProcessingStatus::Failed);
        assert_eq!(
            terminal.error_message.as_deref(),
            Some("Unsupported file type: keynote")
        );
        assert_eq!(
            terminal.metadata.as_ref().unwrap()["error"],
            "Unsupported file type: keynote"
        );
        assert!(backend.chunks().await.is_empty());
        assert_eq!(pipeline.metrics_snapshot().documents_failed, 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal() {
        let backend = Arc::new(InMemoryBackend::new());
        let pipeline = pipeline_with(
            Arc::new(HashingEmbeddingClient::new()),
            backend.clone(),
            backend.clone(),
            1000,
        );
        let mut request = powerpoint_request("req-5");
        request.content = DocumentContent::Remote("https://files.example/deck.pptx".into());

        let error = pipeline.process(request).await.unwrap_err();
        assert!(matches!(error, ProcessingError::Fetch(_)));
        let statuses = backend.statuses().await;
        assert_eq!(statuses.last().unwrap().status, ProcessingStatus::Failed);
    }

    #[test]
    fn ready_metadata_flattens_extraction_fields() {
        let result = extraction::extract(b"", "powerpoint", "deck.pptx").unwrap();
        let value = ready_metadata(
            &result.metadata,
            ProcessingOutcome {
                chunks_created: 3,
                embeddings_created: 2,
            },
        )
        .unwrap();
        assert_eq!(value["fileName"], "deck.pptx");
        assert_eq!(value["totalChunks"], 3);
        assert_eq!(value["successfulEmbeddings"], 2);
        assert!(value.get("extraction").is_none());
    }
}
