//! Transcript chunking for embedding and retrieval.
//!
//! Splits raw transcript text into overlapping fixed-size windows sized
//! for embedding models.

mod window;

pub use window::WindowChunker;

use serde::{Deserialize, Serialize};

/// Unit a chunk's offsets are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Offsets are token positions in the encoded text.
    Tokens,
    /// Offsets are character positions (tokenizer fallback).
    Chars,
}

/// A contiguous, overlapping slice of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Sequence number within the source text, starting at 0.
    pub id: usize,
    /// Text content of this chunk.
    pub text: String,
    /// Start offset in the source (tokens or chars, see `unit`).
    pub start: usize,
    /// End offset in the source (exclusive).
    pub end: usize,
    /// Number of tokens or chars covered.
    pub unit_count: usize,
    /// Whether offsets count tokens or characters.
    pub unit: ChunkUnit,
}

impl TextChunk {
    /// Create a new chunk from a window span.
    pub fn new(id: usize, text: String, start: usize, end: usize, unit: ChunkUnit) -> Self {
        Self {
            id,
            text,
            start,
            end,
            unit_count: end - start,
            unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_creation() {
        let chunk = TextChunk::new(0, "hello".to_string(), 10, 15, ChunkUnit::Tokens);
        assert_eq!(chunk.unit_count, 5);
        assert_eq!(chunk.unit, ChunkUnit::Tokens);
    }
}
