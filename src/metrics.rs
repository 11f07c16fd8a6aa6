use crate::processing::ProcessingOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_created: AtomicU64,
    embeddings_created: AtomicU64,
    chunk_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request that reached `Ready`.
    pub fn record_document(&self, outcome: ProcessingOutcome) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_created
            .fetch_add(outcome.chunks_created as u64, Ordering::Relaxed);
        self.embeddings_created
            .fetch_add(outcome.embeddings_created as u64, Ordering::Relaxed);
    }

    /// Record a request that ended in `Failed`.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk that was skipped after an embedding or persistence error.
    pub fn record_chunk_failure(&self) {
        self.chunk_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_created: self.chunks_created.load(Ordering::Relaxed),
            embeddings_created: self.embeddings_created.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Requests that reached `Ready`.
    pub documents_processed: u64,
    /// Requests that ended in `Failed`.
    pub documents_failed: u64,
    /// Total chunks produced across ready requests.
    pub chunks_created: u64,
    /// Total chunks embedded and stored.
    pub embeddings_created: u64,
    /// Chunks skipped after a per-chunk failure.
    pub chunk_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_document(ProcessingOutcome {
            chunks_created: 2,
            embeddings_created: 2,
        });
        metrics.record_document(ProcessingOutcome {
            chunks_created: 3,
            embeddings_created: 1,
        });
        metrics.record_chunk_failure();
        metrics.record_chunk_failure();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_processed, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.chunks_created, 5);
        assert_eq!(snapshot.embeddings_created, 3);
        assert_eq!(snapshot.chunk_failures, 2);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
