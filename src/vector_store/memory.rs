//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets. Not persistent.

use super::{cosine_distance, ChunkRecord, RetrievedChunk, VectorStore};
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store keyed by record id.
pub struct MemoryVectorStore {
    records: RwLock<HashMap<String, ChunkRecord>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, records: &[ChunkRecord]) -> Result<usize> {
        let mut store = self
            .records
            .write()
            .map_err(|e| LektorError::VectorStore(format!("Lock poisoned: {}", e)))?;

        for record in records {
            store.insert(record.record_id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let store = self
            .records
            .read()
            .map_err(|e| LektorError::VectorStore(format!("Lock poisoned: {}", e)))?;

        let mut results: Vec<RetrievedChunk> = store
            .values()
            .filter(|r| r.metadata.video_id == video_id)
            .map(|r| RetrievedChunk {
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(query_embedding, &r.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete_video(&self, video_id: &str) -> Result<usize> {
        let mut store = self
            .records
            .write()
            .map_err(|e| LektorError::VectorStore(format!("Lock poisoned: {}", e)))?;

        let initial_len = store.len();
        store.retain(|_, r| r.metadata.video_id != video_id);
        Ok(initial_len - store.len())
    }

    async fn chunk_count(&self, video_id: &str) -> Result<usize> {
        let store = self
            .records
            .read()
            .map_err(|e| LektorError::VectorStore(format!("Lock poisoned: {}", e)))?;

        Ok(store
            .values()
            .filter(|r| r.metadata.video_id == video_id)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkUnit, TextChunk};

    fn record(video_id: &str, chunk_id: usize, embedding: Vec<f32>) -> ChunkRecord {
        let chunk = TextChunk::new(
            chunk_id,
            format!("chunk {}", chunk_id),
            chunk_id * 10,
            chunk_id * 10 + 10,
            ChunkUnit::Tokens,
        );
        ChunkRecord::new(video_id, &chunk, embedding)
    }

    #[tokio::test]
    async fn test_upsert_idempotence() {
        let store = MemoryVectorStore::new();

        let records = vec![
            record("video1", 0, vec![1.0, 0.0]),
            record("video1", 1, vec![0.0, 1.0]),
        ];

        store.upsert_batch(&records).await.unwrap();
        assert_eq!(store.chunk_count("video1").await.unwrap(), 2);

        // Same records again must not grow the index.
        store.upsert_batch(&records).await.unwrap();
        assert_eq!(store.chunk_count("video1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_is_scoped_and_ranked() {
        let store = MemoryVectorStore::new();

        store
            .upsert_batch(&[
                record("video_a", 0, vec![1.0, 0.0]),
                record("video_a", 1, vec![0.7, 0.7]),
                record("video_b", 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.query("video_a", &[1.0, 0.0], 10).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata.video_id == "video_a"));
        assert_eq!(results[0].metadata.chunk_id, 0);
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_delete_is_scoped() {
        let store = MemoryVectorStore::new();

        store
            .upsert_batch(&[
                record("video_a", 0, vec![1.0]),
                record("video_b", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_video("video_a").await.unwrap(), 1);
        assert_eq!(store.chunk_count("video_a").await.unwrap(), 0);
        assert_eq!(store.chunk_count("video_b").await.unwrap(), 1);
        assert_eq!(store.delete_video("video_a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_top_k_truncation() {
        let store = MemoryVectorStore::new();

        let records: Vec<ChunkRecord> = (0..8)
            .map(|i| record("video1", i, vec![1.0, i as f32 * 0.1]))
            .collect();
        store.upsert_batch(&records).await.unwrap();

        let results = store.query("video1", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
