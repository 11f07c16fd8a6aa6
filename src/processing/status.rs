//! Processing status values and the per-request transition guard.

use crate::gateway::StatusGateway;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Lifecycle state of one file-processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Work has started.
    Processing,
    /// Extraction and chunking succeeded; counts are in the metadata.
    Ready,
    /// A fatal stage failed.
    Failed,
}

impl ProcessingStatus {
    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// `Ready` and `Failed` admit no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload sent to the status gateway for one transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// New status.
    pub status: ProcessingStatus,
    /// Optional structured metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Optional error message (set on `Failed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusUpdate {
    /// Initial `Processing` report with no payload.
    pub fn processing() -> Self {
        Self {
            status: ProcessingStatus::Processing,
            metadata: None,
            error_message: None,
        }
    }

    /// Terminal `Ready` report.
    pub fn ready(metadata: Option<Value>) -> Self {
        Self {
            status: ProcessingStatus::Ready,
            metadata,
            error_message: None,
        }
    }

    /// Terminal `Failed` report.
    pub fn failed(message: String, metadata: Option<Value>) -> Self {
        Self {
            status: ProcessingStatus::Failed,
            metadata,
            error_message: Some(message),
        }
    }
}

/// Drives the status of one request through `Processing → (Ready | Failed)`.
///
/// Out-of-order transitions are refused and logged. Gateway failures are logged and do not
/// change the tracked state: the status channel is best-effort.
pub(crate) struct StatusTracker<'a> {
    gateway: &'a dyn StatusGateway,
    request_id: &'a str,
    current: Option<ProcessingStatus>,
}

impl<'a> StatusTracker<'a> {
    pub(crate) fn new(gateway: &'a dyn StatusGateway, request_id: &'a str) -> Self {
        Self {
            gateway,
            request_id,
            current: None,
        }
    }

    /// Apply `update` if the transition is legal. Returns whether it was applied.
    pub(crate) async fn transition(&mut self, update: StatusUpdate) -> bool {
        if !is_allowed(self.current, update.status) {
            tracing::warn!(
                request_id = self.request_id,
                from = ?self.current,
                to = %update.status,
                "Refusing out-of-order status transition"
            );
            return false;
        }
        self.current = Some(update.status);

        if let Err(error) = self.gateway.report_status(self.request_id, &update).await {
            tracing::warn!(
                request_id = self.request_id,
                status = %update.status,
                error = %error,
                "Status update failed; continuing"
            );
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<ProcessingStatus> {
        self.current
    }
}

fn is_allowed(from: Option<ProcessingStatus>, to: ProcessingStatus) -> bool {
    match from {
        None => to == ProcessingStatus::Processing,
        Some(ProcessingStatus::Processing) => to.is_terminal(),
        Some(_) => false,
    }
}
