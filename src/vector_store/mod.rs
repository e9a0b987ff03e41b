//! Vector store abstraction for Lektor.
//!
//! One shared collection holds the chunks of every video, partitioned
//! logically by the `video_id` field. Every query and delete is scoped by
//! `video_id` so records for different videos can never leak into each
//! other's results.
//!
//! The distance metric is cosine distance (`1 - cosine similarity`), so
//! `1 - distance` is an exact similarity value for display.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::TextChunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata carried with every indexed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Video this chunk belongs to.
    pub video_id: String,
    /// Sequence number of the chunk within the video.
    pub chunk_id: usize,
    /// Token (or char) count covered by the chunk.
    pub token_count: usize,
    /// Start offset in the source transcript.
    pub start_offset: usize,
    /// End offset in the source transcript (exclusive).
    pub end_offset: usize,
}

/// One indexed unit: a chunk's text, its embedding, and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic record id: `{video_id}_chunk_{chunk_id}`.
    ///
    /// Re-ingesting a video produces the same ids, so an upserting store
    /// replaces prior vectors instead of accumulating duplicates.
    pub record_id: String,
    /// Chunk text, returned verbatim on retrieval.
    pub text: String,
    /// Embedding vector (dimension fixed by the embedding provider).
    pub embedding: Vec<f32>,
    /// Chunk metadata.
    pub metadata: ChunkMetadata,
    /// When this record was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Build a record from a chunk and its embedding.
    pub fn new(video_id: &str, chunk: &TextChunk, embedding: Vec<f32>) -> Self {
        Self {
            record_id: format!("{}_chunk_{}", video_id, chunk.id),
            text: chunk.text.clone(),
            embedding,
            metadata: ChunkMetadata {
                video_id: video_id.to_string(),
                chunk_id: chunk.id,
                token_count: chunk.unit_count,
                start_offset: chunk.start,
                end_offset: chunk.end,
            },
            indexed_at: Utc::now(),
        }
    }
}

/// A retrieved chunk with its distance from the query vector.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The chunk text.
    pub text: String,
    /// The chunk's metadata.
    pub metadata: ChunkMetadata,
    /// Cosine distance from the query (lower = more similar).
    pub distance: f32,
}

impl RetrievedChunk {
    /// Similarity display value derived from the cosine distance.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert records by `record_id`. A repeated id replaces the prior
    /// entry, never duplicates it. Returns the number of records written.
    async fn upsert_batch(&self, records: &[ChunkRecord]) -> Result<usize>;

    /// Return up to `top_k` chunks for a video, ordered by ascending
    /// distance. An unindexed video yields an empty list, not an error.
    async fn query(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Delete all chunks for a video. Returns the number removed (0 if
    /// the video was never indexed).
    async fn delete_video(&self, video_id: &str) -> Result<usize>;

    /// Number of chunks indexed for a video.
    async fn chunk_count(&self, video_id: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 for empty or mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance: `1 - cosine similarity`, so lower means more similar.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
