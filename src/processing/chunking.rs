//! Sentence-boundary chunking.
//!
//! Text is split on sentence terminators (`.`, `!`, `?`; a run of terminators counts as one),
//! empty sentences are dropped, and the rest are packed greedily into chunks joined by `". "`.
//! A chunk never exceeds `max_chunk_size` characters unless it holds a single sentence that is
//! longer than the limit on its own; sentences are never cut.
//!
//! The overflow check counts the full two-character joiner rather than a single separator
//! character. With one character counted, a buffer could be grown to `max_chunk_size + 1`
//! characters, breaking the bound above.

use super::types::{Chunk, ChunkingError};

const SENTENCE_SEPARATOR: &str = ". ";

/// Split `text` into ordered chunks of at most `max_chunk_size` characters.
///
/// Returns an empty vector when the input is empty or whitespace-only.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Result<Vec<Chunk>, ChunkingError> {
    if max_chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let chunks = pack_sentences(split_sentences(text), max_chunk_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect();
    Ok(chunks)
}

/// Sentences of `text`, trimmed, with empty fragments removed.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

fn pack_sentences(sentences: Vec<&str>, max_chunk_size: usize) -> Vec<String> {
    let separator_len = SENTENCE_SEPARATOR.chars().count();
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();
        if buffer.is_empty() {
            buffer.push_str(sentence);
            buffer_len = sentence_len;
            continue;
        }

        if buffer_len + separator_len + sentence_len > max_chunk_size {
            chunks.push(std::mem::take(&mut buffer));
            buffer.push_str(sentence);
            buffer_len = sentence_len;
        } else {
            buffer.push_str(SENTENCE_SEPARATOR);
            buffer.push_str(sentence);
            buffer_len += separator_len + sentence_len;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}
