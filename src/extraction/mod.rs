//! Format-specific text extraction.
//!
//! Every supported format maps to one [`FileFormat`] variant and one handler module. Handlers
//! only parse in-memory bytes; the common metadata (file name, timestamp, length, hash) is
//! attached here once the handler has produced its text.

mod excel;
mod pdf;
mod powerpoint;
mod word;

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::timestamp::current_timestamp_rfc3339;

/// Closed set of document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Portable Document Format.
    Pdf,
    /// OOXML word-processing document (`.docx`).
    Word,
    /// Spreadsheet workbook (`.xlsx`, `.xls`).
    Excel,
    /// Presentation deck (`.pptx`).
    #[serde(rename = "powerpoint")]
    PowerPoint,
}

impl FileFormat {
    /// Canonical lowercase tag used on the wire and in metadata.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Excel => "excel",
            Self::PowerPoint => "powerpoint",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = ExtractionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "word" | "docx" => Ok(Self::Word),
            "excel" | "xlsx" | "xls" => Ok(Self::Excel),
            "powerpoint" | "pptx" => Ok(Self::PowerPoint),
            _ => Err(ExtractionError::UnsupportedFormat(tag.to_string())),
        }
    }
}

/// Errors raised while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared format tag is not one of the supported formats.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// The underlying parser rejected the document.
    #[error("Failed to extract {format} content from '{file_name}': {message}")]
    Malformed {
        /// Format the bytes were parsed as.
        format: FileFormat,
        /// Display name of the document.
        file_name: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Parsing succeeded but produced no text.
    #[error("No text content could be extracted from {format} file '{file_name}'")]
    EmptyContent {
        /// Format the bytes were parsed as.
        format: FileFormat,
        /// Display name of the document.
        file_name: String,
    },
}

/// Descriptive metadata produced alongside the extracted text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    /// Format the document was parsed as.
    pub format: FileFormat,
    /// Display name of the document.
    pub file_name: String,
    /// RFC 3339 timestamp taken when extraction finished.
    pub extracted_at: String,
    /// Length of the extracted text in characters.
    pub content_length: usize,
    /// Hex-encoded SHA-256 of the extracted text.
    pub content_hash: String,
    /// Number of pages (PDF only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Number of worksheets (spreadsheets only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<usize>,
    /// Non-fatal conversion warnings (Word only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    /// Free-form note about how the content was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Plain text and metadata for one document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted text, trimmed of surrounding whitespace.
    pub text: String,
    /// Format-specific and common metadata.
    pub metadata: ExtractionMetadata,
}

/// Raw handler output before the common metadata is attached.
#[derive(Debug, Default)]
pub(crate) struct FormatOutput {
    pub(crate) text: String,
    pub(crate) page_count: Option<usize>,
    pub(crate) sheet_count: Option<usize>,
    pub(crate) warnings: Option<Vec<String>>,
    pub(crate) note: Option<String>,
}

/// Extract text from `bytes`, interpreting them according to the declared `format_tag`.
pub fn extract(
    bytes: &[u8],
    format_tag: &str,
    file_name: &str,
) -> Result<ExtractionResult, ExtractionError> {
    let format: FileFormat = format_tag.parse()?;
    extract_format(bytes, format, file_name)
}

/// Extract text from `bytes` for an already-resolved [`FileFormat`].
pub fn extract_format(
    bytes: &[u8],
    format: FileFormat,
    file_name: &str,
) -> Result<ExtractionResult, ExtractionError> {
    let output = match format {
        FileFormat::Pdf => pdf::extract(bytes),
        FileFormat::Word => word::extract(bytes),
        FileFormat::Excel => excel::extract(bytes),
        FileFormat::PowerPoint => Ok(powerpoint::extract(file_name)),
    }
    .map_err(|message| ExtractionError::Malformed {
        format,
        file_name: file_name.to_string(),
        message,
    })?;

    let text = output.text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractionError::EmptyContent {
            format,
            file_name: file_name.to_string(),
        });
    }

    let metadata = ExtractionMetadata {
        format,
        file_name: file_name.to_string(),
        extracted_at: current_timestamp_rfc3339(),
        content_length: text.chars().count(),
        content_hash: hash_content(&text),
        page_count: output.page_count,
        sheet_count: output.sheet_count,
        warnings: output.warnings,
        note: output.note,
    };
    tracing::debug!(
        format = %format,
        file_name,
        content_length = metadata.content_length,
        "Extracted document text"
    );

    Ok(ExtractionResult { text, metadata })
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
