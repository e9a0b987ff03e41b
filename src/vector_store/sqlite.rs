//! SQLite-based vector store implementation.
//!
//! Uses SQLite for durable storage with cosine distance computed in Rust.
//! For large datasets consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_distance, ChunkMetadata, ChunkRecord, RetrievedChunk, VectorStore};
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        record_id TEXT PRIMARY KEY,
        video_id TEXT NOT NULL,
        chunk_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        token_count INTEGER NOT NULL,
        start_offset INTEGER NOT NULL,
        end_offset INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_video_id ON chunks(video_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a vector store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL improves concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LektorError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to little-endian f32 bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_batch(&self, records: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for record in records {
            let embedding_bytes = Self::embedding_to_bytes(&record.embedding);

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (record_id, video_id, chunk_id, text, embedding,
                 token_count, start_offset, end_offset, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    record.record_id,
                    record.metadata.video_id,
                    record.metadata.chunk_id as i64,
                    record.text,
                    embedding_bytes,
                    record.metadata.token_count as i64,
                    record.metadata.start_offset as i64,
                    record.metadata.end_offset as i64,
                    record.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Upserted {} chunk records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT text, video_id, chunk_id, token_count, start_offset, end_offset, embedding
            FROM chunks
            WHERE video_id = ?1
            "#,
        )?;

        let rows = stmt.query_map(params![video_id], |row| {
            let embedding_bytes: Vec<u8> = row.get(6)?;
            Ok((
                RetrievedChunk {
                    text: row.get(0)?,
                    metadata: ChunkMetadata {
                        video_id: row.get(1)?,
                        chunk_id: row.get::<_, i64>(2)? as usize,
                        token_count: row.get::<_, i64>(3)? as usize,
                        start_offset: row.get::<_, i64>(4)? as usize,
                        end_offset: row.get::<_, i64>(5)? as usize,
                    },
                    distance: 0.0,
                },
                embedding_bytes,
            ))
        })?;

        let mut results: Vec<RetrievedChunk> = rows
            .filter_map(|r| r.ok())
            .map(|(mut chunk, embedding_bytes)| {
                let embedding = Self::bytes_to_embedding(&embedding_bytes);
                chunk.distance = cosine_distance(query_embedding, &embedding);
                chunk
            })
            .collect();

        // Ascending distance: most similar first
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        debug!("Found {} chunks for video {}", results.len(), video_id);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute("DELETE FROM chunks WHERE video_id = ?1", params![video_id])?;

        info!("Deleted {} chunks for video {}", deleted, video_id);
        Ok(deleted)
    }

    async fn chunk_count(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

// Reading stored records back out, mainly for inspection and tests.
impl SqliteVectorStore {
    /// Fetch all records for a video ordered by chunk id.
    pub fn records_for_video(&self, video_id: &str) -> Result<Vec<ChunkRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, video_id, chunk_id, text, embedding,
                   token_count, start_offset, end_offset, indexed_at
            FROM chunks
            WHERE video_id = ?1
            ORDER BY chunk_id
            "#,
        )?;

        let rows = stmt.query_map(params![video_id], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let indexed_at_str: String = row.get(8)?;

            Ok(ChunkRecord {
                record_id: row.get(0)?,
                text: row.get(3)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                metadata: ChunkMetadata {
                    video_id: row.get(1)?,
                    chunk_id: row.get::<_, i64>(2)? as usize,
                    token_count: row.get::<_, i64>(5)? as usize,
                    start_offset: row.get::<_, i64>(6)? as usize,
                    end_offset: row.get::<_, i64>(7)? as usize,
                },
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
