use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::metadata::DocumentMetadata;
use super::CorpusChunk;

/// Chunking parameters, in words.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Target chunk size in words.
    pub chunk_size: usize,
    /// Words carried over between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 750,
            chunk_overlap: 150,
        }
    }
}

fn paragraph_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"))
}

/// Split text into chunks at paragraph boundaries.
///
/// Paragraphs are accumulated until adding the next one would push the chunk
/// past `chunk_size` words. When overlap is enabled and the emitted chunk
/// held more than one paragraph, the last paragraph is carried into the next
/// chunk so retrieval never loses cross-paragraph context. A single
/// paragraph longer than `chunk_size` becomes its own oversized chunk;
/// paragraphs are never split internally.
pub fn chunk_text(
    text: &str,
    metadata: &DocumentMetadata,
    config: &ChunkerConfig,
) -> Vec<CorpusChunk> {
    let paragraphs: Vec<&str> = paragraph_pattern()
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;
    let mut chunk_index = 0usize;

    for paragraph in paragraphs {
        let paragraph_words = paragraph.split_whitespace().count();

        if current_words + paragraph_words > config.chunk_size && !current.is_empty() {
            chunks.push(CorpusChunk {
                text: current.join("\n\n"),
                metadata: metadata.clone(),
                chunk_index,
                word_count: current_words,
            });
            chunk_index += 1;

            if config.chunk_overlap > 0 && current.len() > 1 {
                let carried = current[current.len() - 1];
                current = vec![carried];
                current_words = carried.split_whitespace().count();
            } else {
                current.clear();
                current_words = 0;
            }
        }

        current.push(paragraph);
        current_words += paragraph_words;
    }

    if !current.is_empty() {
        chunks.push(CorpusChunk {
            text: current.join("\n\n"),
            metadata: metadata.clone(),
            chunk_index,
            word_count: current_words,
        });
    }

    tracing::debug!(
        "Chunked '{}' into {} chunks",
        metadata.title,
        chunks.len()
    );
    chunks
}
