#![deny(missing_docs)]

//! Core library for the document embedding ingestion service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Format-specific text extraction.
pub mod extraction;
/// Outbound status and chunk persistence adapters.
pub mod gateway;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Remote document downloads.
pub mod source;

mod timestamp;
