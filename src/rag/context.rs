//! Context assembly for grounded prompts.

use crate::vector_store::RetrievedChunk;

/// Format retrieved chunks as numbered sources for the answer prompt.
pub fn format_sources_for_prompt(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Source {}]\n{}", i + 1, chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format retrieved chunks as labeled segments for the summary prompt.
pub fn format_segments(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Segment {}]\n{}", i + 1, chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate text to a bounded preview, respecting char boundaries.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(max_chars).collect();
    preview.push_str("...");
    preview
}

/// Take the head of a text, respecting char boundaries.
///
/// Used as the no-retrieval fallback context for summaries.
pub fn head_truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
