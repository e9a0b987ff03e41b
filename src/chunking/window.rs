//! Sliding-window chunker implementation.
//!
//! Encodes text with the cl100k_base vocabulary and slides a fixed-size
//! token window with overlap. Falls back to character windows when the
//! tokenizer is unavailable or a window does not decode cleanly.

use super::{ChunkUnit, TextChunk};
use crate::error::{LektorError, Result};
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::debug;

/// Approximate characters-per-token ratio used for the character fallback.
const CHARS_PER_TOKEN: usize = 4;

/// Fixed-size sliding-window chunker with overlap.
pub struct WindowChunker {
    encoder: Option<CoreBPE>,
    max_window: usize,
    overlap: usize,
}

impl WindowChunker {
    /// Create a chunker with the given window size and overlap (in tokens).
    ///
    /// Requires `max_window >= 1` and `overlap < max_window`.
    pub fn new(max_window: usize, overlap: usize) -> Result<Self> {
        Self::validate(max_window, overlap)?;
        // Encoder construction failing is not fatal: chunking degrades
        // to character windows.
        let encoder = cl100k_base().ok();
        if encoder.is_none() {
            debug!("cl100k_base encoder unavailable, using character windows");
        }

        Ok(Self {
            encoder,
            max_window,
            overlap,
        })
    }

    /// Create a chunker that always uses character windows.
    ///
    /// Window and overlap are still given in tokens; character windows are
    /// sized at `CHARS_PER_TOKEN` times larger.
    pub fn char_based(max_window: usize, overlap: usize) -> Result<Self> {
        Self::validate(max_window, overlap)?;
        Ok(Self {
            encoder: None,
            max_window,
            overlap,
        })
    }

    fn validate(max_window: usize, overlap: usize) -> Result<()> {
        if max_window == 0 {
            return Err(LektorError::InvalidInput(
                "chunk window must be at least 1 token".to_string(),
            ));
        }
        if overlap >= max_window {
            return Err(LektorError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than the window ({})",
                overlap, max_window
            )));
        }
        Ok(())
    }

    /// Count tokens in a text, or estimate from characters when no
    /// tokenizer is available.
    pub fn count_tokens(&self, text: &str) -> usize {
        match &self.encoder {
            Some(encoder) => encoder.encode_with_special_tokens(text).len(),
            None => text.chars().count().div_ceil(CHARS_PER_TOKEN),
        }
    }

    /// Split text into overlapping window chunks.
    ///
    /// Pure: never fails for well-formed string input. Empty text yields
    /// an empty sequence. Chunk ids are a contiguous 0-based sequence and
    /// consecutive chunks overlap by the configured amount; the final
    /// chunk may be shorter than the window.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        if let Some(encoder) = &self.encoder {
            if let Some(chunks) = self.chunk_tokens(encoder, text) {
                return chunks;
            }
            debug!("token window decode failed, falling back to character windows");
        }

        self.chunk_chars(text)
    }

    /// Token-based windowing. Returns `None` if any window fails to decode
    /// back to valid UTF-8 (the caller then falls back to characters).
    fn chunk_tokens(&self, encoder: &CoreBPE, text: &str) -> Option<Vec<TextChunk>> {
        let tokens = encoder.encode_with_special_tokens(text);
        let spans = window_spans(tokens.len(), self.max_window, self.overlap);

        let mut chunks = Vec::with_capacity(spans.len());
        for (id, (start, end)) in spans.into_iter().enumerate() {
            let window = tokens[start..end].to_vec();
            let chunk_text = encoder.decode(window).ok()?;
            chunks.push(TextChunk::new(id, chunk_text, start, end, ChunkUnit::Tokens));
        }

        Some(chunks)
    }

    /// Character-based windowing over char boundaries (not bytes).
    fn chunk_chars(&self, text: &str) -> Vec<TextChunk> {
        let max_chars = self.max_window * CHARS_PER_TOKEN;
        let overlap_chars = self.overlap * CHARS_PER_TOKEN;

        // Byte offset of each char, so windows slice on char boundaries.
        let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = boundaries.len();
        let byte_at = |pos: usize| {
            if pos >= total {
                text.len()
            } else {
                boundaries[pos]
            }
        };

        window_spans(total, max_chars, overlap_chars)
            .into_iter()
            .enumerate()
            .map(|(id, (start, end))| {
                let chunk_text = text[byte_at(start)..byte_at(end)].to_string();
                TextChunk::new(id, chunk_text, start, end, ChunkUnit::Chars)
            })
            .collect()
    }
}

/// Compute `(start, end)` spans for a sliding window over `n` units.
///
/// The window advances by `max_window - overlap` each step and the last
/// span ends exactly at `n`. Terminates once a span reaches the end, and
/// guards against a non-advancing start position.
fn window_spans(n: usize, max_window: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if n == 0 {
        return spans;
    }

    let mut start = 0;
    loop {
        let end = (start + max_window).min(n);
        spans.push((start, end));
        if end >= n {
            break;
        }
        let next = end - overlap;
        if next <= start {
            break;
        }
        start = next;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters() {
        assert!(WindowChunker::new(0, 0).is_err());
        assert!(WindowChunker::new(10, 10).is_err());
        assert!(WindowChunker::new(10, 11).is_err());
        assert!(WindowChunker::new(10, 9).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let chunker = WindowChunker::new(1000, 100).unwrap();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = WindowChunker::new(1000, 100).unwrap();
        let text = "A short transcript about software architecture.";

        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, chunker.count_tokens(text));
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_token_ids_and_offsets() {
        let chunker = WindowChunker::new(50, 5).unwrap();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);

        let chunks = chunker.chunk(&text);
        let total = chunker.count_tokens(&text);
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert_eq!(chunk.start, i * 45);
            assert!(chunk.unit_count <= 50);
            assert_eq!(chunk.unit, ChunkUnit::Tokens);
        }
        assert_eq!(chunks.last().unwrap().end, total);
    }

    #[test]
    fn test_char_fallback_coverage() {
        // 80 chars, windows of 8*4=32 chars with 2*4=8 overlap (stride 24).
        let chunker = WindowChunker::char_based(8, 2).unwrap();
        let text = "a".repeat(80);

        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| (c.start, c.end)).collect::<Vec<_>>(),
            vec![(0, 32), (24, 56), (48, 80)]
        );

        // De-overlapped concatenation reconstructs the source exactly.
        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.text.chars().skip(8).collect::<String>());
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_char_fallback_multibyte_boundaries() {
        let chunker = WindowChunker::char_based(2, 1).unwrap();
        let text = "æøå".repeat(10);

        let chunks = chunker.chunk(&text);

        assert!(!chunks.is_empty());
        assert_eq!(chunks.last().unwrap().end, 30);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 8);
        }
    }

    #[test]
    fn test_termination_window_one() {
        let chunker = WindowChunker::new(1, 0).unwrap();
        let chunks = chunker.chunk("one two three four");

        assert_eq!(chunks.len(), chunker.count_tokens("one two three four"));
        for chunk in &chunks {
            assert_eq!(chunk.unit_count, 1);
        }
    }

    #[test]
    fn test_termination_maximum_overlap() {
        // overlap = window - 1 gives stride 1 and must still terminate.
        let chunker = WindowChunker::new(2, 1).unwrap();
        let text = "alpha beta gamma delta";
        let n = chunker.count_tokens(text);

        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), n - 1);
        assert_eq!(chunks.last().unwrap().end, n);
    }

    #[test]
    fn test_stride_arithmetic() {
        // Spans derived from window - overlap: starts at i * stride, the
        // last chunk is allowed to be shorter than the window.
        let spans = window_spans(200, 40, 4);

        assert_eq!(spans.len(), 6);
        for (i, (start, _)) in spans.iter().enumerate() {
            assert_eq!(*start, i * 36);
        }
        assert_eq!(spans.last().unwrap().1, 200);
        assert_eq!(spans.last().unwrap().1 - spans.last().unwrap().0, 20);
    }

    #[test]
    fn test_window_spans_cover_everything() {
        for n in [1, 5, 39, 40, 41, 199, 200, 201] {
            let spans = window_spans(n, 40, 10);
            assert_eq!(spans[0].0, 0);
            assert_eq!(spans.last().unwrap().1, n);
            for pair in spans.windows(2) {
                // Next window starts before the previous one ends.
                assert!(pair[1].0 < pair[0].1);
                assert_eq!(pair[1].0, pair[0].1 - 10);
            }
        }
    }
}
