//! RAG (Retrieval-Augmented Generation) over indexed video transcripts.
//!
//! Ties chunking, embedding, and the vector index together: ingest a
//! transcript, answer questions with grounded sources, and build
//! retrieval-backed summaries.

pub mod context;
mod engine;

pub use engine::RagEngine;

use serde::{Deserialize, Serialize};

/// A source chunk attached to a grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Chunk sequence number within the video.
    pub chunk_id: usize,
    /// Bounded preview of the chunk text.
    pub preview: String,
    /// Similarity score derived from the retrieval distance.
    pub similarity: f32,
}

/// A grounded answer with its supporting sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// The generated answer text.
    pub answer: String,
    /// Sources used to ground the answer (empty for the canned
    /// nothing-found response).
    pub sources: Vec<SourceRef>,
}

/// Kind of summary to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    /// 3-5 core sentences.
    Brief,
    /// 5-10 key points as bullets.
    Bullet,
    /// Full summary with topics, arguments, and conclusions.
    #[default]
    Detailed,
}

impl std::str::FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brief" => Ok(SummaryType::Brief),
            "bullet" | "bullets" => Ok(SummaryType::Bullet),
            "detailed" => Ok(SummaryType::Detailed),
            _ => Err(format!("Unknown summary type: {}", s)),
        }
    }
}

impl std::fmt::Display for SummaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryType::Brief => write!(f, "brief"),
            SummaryType::Bullet => write!(f, "bullet"),
            SummaryType::Detailed => write!(f, "detailed"),
        }
    }
}
