//! Document loading and chunking for ingestion.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::config::IngestConfig;

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl From<&IngestConfig> for ChunkerConfig {
    fn from(config: &IngestConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Source identifier (file path)
    pub source: String,
    /// Character offset in original document
    pub start_offset: usize,
    pub chunk_index: usize,
}

pub struct DocumentChunker {
    config: ChunkerConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text into overlapping chunks, preferring to cut after a sentence.
    pub fn split_into_chunks(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chunk_size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        let mut start = 0;

        while start < total_chars {
            let end = (start + chunk_size).min(total_chars);
            let window = &chars[start..end];

            let cut = if end < total_chars {
                find_sentence_boundary(window)
            } else {
                window.len()
            };

            let chunk_text: String = window[..cut].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index: chunks.len(),
                });
            }

            if end == total_chars {
                break;
            }
            // Overlap is measured back from the actual cut so nothing between
            // a short chunk and the next window is dropped.
            start = (start + cut).saturating_sub(overlap).max(start + 1);
        }

        chunks
    }
}

/// Length of `window` up to and including the last sentence ending found in
/// its final 20%, or the whole window when there is none.
fn find_sentence_boundary(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;

    for pos in (search_start..window.len().saturating_sub(1)).rev() {
        if matches!(window[pos], '.' | '!' | '?') && matches!(window[pos + 1], ' ' | '\n') {
            return pos + 2;
        }
    }

    window.len()
}

/// Read a document as plain text. `.pdf` files go through `pdf-extract`,
/// anything else is read as UTF-8.
pub fn load_document(path: &Path) -> anyhow::Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        pdf_extract::extract_text(path)
            .with_context(|| format!("Failed to extract text from PDF {}", path.display()))
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document {}", path.display()))
    }
}
