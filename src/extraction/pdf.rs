use super::FormatOutput;
use std::panic;

/// Parse a PDF, counting pages with `lopdf` and pulling text with `pdf-extract`.
pub(super) fn extract(bytes: &[u8]) -> Result<FormatOutput, String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|err| err.to_string())?;
    let page_count = document.get_pages().len();

    // pdf-extract panics on some malformed font tables.
    let text = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| "PDF text extraction aborted on malformed content".to_string())?
        .map_err(|err| err.to_string())?;

    Ok(FormatOutput {
        text,
        page_count: Some(page_count),
        ..FormatOutput::default()
    })
}
