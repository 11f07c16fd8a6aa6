use super::FormatOutput;

const DEEP_EXTRACTION_NOTE: &str = "PowerPoint slide text extraction is not implemented; placeholder content stored";

/// Presentations are stored as a placeholder so downstream persistence still gets content.
pub(super) fn extract(file_name: &str) -> FormatOutput {
    FormatOutput {
        text: format!(
            "PowerPoint presentation: {file_name}\n\nSlide content extraction is not available for this file type."
        ),
        note: Some(DEEP_EXTRACTION_NOTE.to_string()),
        ..FormatOutput::default()
    }
}
