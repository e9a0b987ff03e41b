//! The RAG engine: ingest, grounded answers, and contextual summaries.

use super::context::{format_segments, format_sources_for_prompt, head_truncate, truncate_preview};
use super::{RagAnswer, SourceRef, SummaryType};
use crate::chunking::WindowChunker;
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{LektorError, Result};
use crate::llm::ChatModel;
use crate::vector_store::{ChunkRecord, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

/// Characters of raw text kept when summarization has no retrieval
/// context to work with.
const FALLBACK_CONTEXT_CHARS: usize = 12_000;

/// RAG engine for one vector index.
///
/// The same embedder instance is used at ingest and query time, so
/// query vectors are always produced by the backend that indexed the
/// video (within one engine's lifetime).
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    chunker: WindowChunker,
    prompts: Prompts,
    top_k: usize,
    preview_chars: usize,
    max_tokens: u32,
    // Serializes ingest per video so a concurrent re-ingest of the same
    // video cannot interleave its delete/upsert with another.
    ingest_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RagEngine {
    /// Create an engine with default retrieval parameters.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        chunker: WindowChunker,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            chunker,
            prompts: Prompts::default(),
            top_k: 5,
            preview_chars: 200,
            max_tokens: 2000,
            ingest_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set retrieval parameters.
    pub fn with_retrieval(mut self, top_k: usize, preview_chars: usize) -> Self {
        self.top_k = top_k;
        self.preview_chars = preview_chars;
        self
    }

    /// Set the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Chunk, embed, and index a transcript. Returns the number of chunks
    /// indexed.
    ///
    /// Ingest never fails: embedding or index errors are logged and
    /// reported as 0 chunks, so a summarization flow that wanted RAG
    /// context simply proceeds without it. Prior records for the video
    /// are cleared before the new ones are written, so re-ingesting is
    /// idempotent and vectors from different embedding backends are
    /// never mixed within one video.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn ingest(&self, video_id: &str, text: &str) -> usize {
        let lock = self.video_lock(video_id).await;
        let _guard = lock.lock().await;

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return 0;
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = match self.embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Embedding failed, continuing without RAG context: {}", e);
                return 0;
            }
        };

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord::new(video_id, chunk, embedding))
            .collect();

        if let Err(e) = self.store.delete_video(video_id).await {
            warn!("Failed to clear prior index for {}: {}", video_id, e);
            return 0;
        }

        match self.store.upsert_batch(&records).await {
            Ok(count) => {
                info!("Indexed {} chunks for video {}", count, video_id);
                count
            }
            Err(e) => {
                warn!("Indexing failed, continuing without RAG context: {}", e);
                0
            }
        }
    }

    /// Get (or create) the per-video ingest lock.
    async fn video_lock(&self, video_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.ingest_locks.lock().await;
        locks
            .entry(video_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Answer a question about an indexed video with the default `top_k`.
    pub async fn answer(&self, video_id: &str, question: &str) -> Result<RagAnswer> {
        self.answer_top_k(video_id, question, self.top_k).await
    }

    /// Answer a question about an indexed video.
    ///
    /// Fails with `NotIndexed` when the video has no chunks; the caller
    /// should re-ingest and retry. An empty retrieval produces a canned
    /// answer with no sources and does not call the LLM.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer_top_k(
        &self,
        video_id: &str,
        question: &str,
        top_k: usize,
    ) -> Result<RagAnswer> {
        if self.store.chunk_count(video_id).await? == 0 {
            return Err(LektorError::NotIndexed(video_id.to_string()));
        }

        let query_embedding = self.embedder.embed(question).await?;
        let retrieved = self.store.query(video_id, &query_embedding, top_k).await?;

        if retrieved.is_empty() {
            return Ok(RagAnswer {
                answer: self.prompts.rag.not_found.clone(),
                sources: Vec::new(),
            });
        }

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("sources".to_string(), format_sources_for_prompt(&retrieved));

        let user_prompt = Prompts::render(&self.prompts.rag.user, &vars);
        let answer = self
            .chat
            .complete(&self.prompts.rag.system, &user_prompt, self.max_tokens)
            .await?;

        let sources = retrieved
            .iter()
            .map(|chunk| SourceRef {
                chunk_id: chunk.metadata.chunk_id,
                preview: truncate_preview(&chunk.text, self.preview_chars),
                similarity: chunk.similarity(),
            })
            .collect();

        Ok(RagAnswer { answer, sources })
    }

    /// Generate a summary backed by retrieved context.
    ///
    /// The video is ingested first if it isn't indexed yet. Context is
    /// assembled from the chunks nearest a generic overview query; if
    /// indexing or retrieval fails at any step the raw text head is used
    /// instead.
    #[instrument(skip(self, text), fields(summary_type = %summary_type))]
    pub async fn summarize_with_context(
        &self,
        video_id: &str,
        text: &str,
        summary_type: SummaryType,
    ) -> Result<String> {
        let context = self.build_summary_context(video_id, text).await;

        let template = match summary_type {
            SummaryType::Brief => &self.prompts.summary.brief,
            SummaryType::Bullet => &self.prompts.summary.bullet,
            SummaryType::Detailed => &self.prompts.summary.detailed,
        };

        let mut vars = HashMap::new();
        vars.insert("content".to_string(), context);
        let user_prompt = Prompts::render(template, &vars);

        self.chat
            .complete(&self.prompts.summary.system, &user_prompt, self.max_tokens)
            .await
    }

    /// Assemble a representative context window for summarization,
    /// degrading to a head-truncation of the raw text.
    async fn build_summary_context(&self, video_id: &str, text: &str) -> String {
        let indexed = matches!(self.store.chunk_count(video_id).await, Ok(n) if n > 0);

        if !indexed && self.ingest(video_id, text).await == 0 {
            return head_truncate(text, FALLBACK_CONTEXT_CHARS);
        }

        let query_embedding = match self.embedder.embed(&self.prompts.summary.overview_query).await
        {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Overview query embedding failed: {}", e);
                return head_truncate(text, FALLBACK_CONTEXT_CHARS);
            }
        };

        let retrieved = match self.store.query(video_id, &query_embedding, self.top_k).await {
            Ok(retrieved) => retrieved,
            Err(e) => {
                warn!("Context retrieval failed: {}", e);
                return head_truncate(text, FALLBACK_CONTEXT_CHARS);
            }
        };

        if retrieved.is_empty() {
            return head_truncate(text, FALLBACK_CONTEXT_CHARS);
        }

        format_segments(&retrieved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MemoryVectorStore, RetrievedChunk};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic embedder: an 8-dim byte histogram of the text.
    struct TestEmbedder;

    fn embed_text(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        for (i, b) in text.bytes().enumerate() {
            v[i % 8] += b as f32;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    #[async_trait]
    impl Embedder for TestEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(embed_text(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| embed_text(t)).collect())
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(LektorError::Provider("embeddings down".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(LektorError::Provider("embeddings down".to_string()))
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    /// Chat mock that records the last user prompt.
    struct RecordingChat {
        calls: AtomicUsize,
        last_user: Mutex<Option<String>>,
        reply: String,
    }

    impl RecordingChat {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_user: Mutex::new(None),
                reply: reply.to_string(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> String {
            self.last_user.lock().unwrap().clone().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for RecordingChat {
        async fn complete(&self, _system: &str, user: &str, _max_tokens: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_user.lock().unwrap() = Some(user.to_string());
            Ok(self.reply.clone())
        }
    }

    fn engine(chat: Arc<RecordingChat>) -> RagEngine {
        RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(TestEmbedder),
            chat,
            WindowChunker::new(1000, 100).unwrap(),
        )
    }

    fn transcript_600_words() -> String {
        "the lecture covers decoupling of software components and state management "
            .repeat(60)
    }

    #[tokio::test]
    async fn test_end_to_end_single_chunk() {
        let chat = RecordingChat::new("The video is about software architecture.");
        let engine = engine(chat.clone());
        let text = transcript_600_words();

        let count = engine.ingest("v1", &text).await;
        assert_eq!(count, 1);
        assert_eq!(engine.store.chunk_count("v1").await.unwrap(), 1);

        let answer = engine.answer("v1", "what is this about?").await.unwrap();

        assert_eq!(answer.answer, "The video is about software architecture.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chunk_id, 0);
        assert!(answer.sources[0].preview.chars().count() <= 203);
        assert!(text.starts_with(answer.sources[0].preview.trim_end_matches("...")));
        assert!(chat.last_prompt().contains("[Source 1]"));
        assert!(chat.last_prompt().contains("what is this about?"));
    }

    #[tokio::test]
    async fn test_multi_chunk_ingest_offsets() {
        let chat = RecordingChat::new("ok");
        let engine = RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(TestEmbedder),
            chat,
            WindowChunker::new(50, 5).unwrap(),
        );

        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);
        let count = engine.ingest("v2", &text).await;
        assert!(count > 1);

        let all = engine
            .store
            .query("v2", &embed_text("fox"), count)
            .await
            .unwrap();
        assert_eq!(all.len(), count);

        let mut starts: Vec<(usize, usize)> = all
            .iter()
            .map(|c| (c.metadata.chunk_id, c.metadata.start_offset))
            .collect();
        starts.sort();
        for (chunk_id, start) in starts {
            assert_eq!(start, chunk_id * 45);
        }
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let chat = RecordingChat::new("ok");
        let engine = engine(chat);
        let text = transcript_600_words();

        let first = engine.ingest("v1", &text).await;
        let second = engine.ingest("v1", &text).await;

        assert_eq!(first, second);
        assert_eq!(engine.store.chunk_count("v1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_answer_unindexed_video() {
        let chat = RecordingChat::new("ok");
        let engine = engine(chat);

        match engine.answer("missing", "question?").await {
            Err(LektorError::NotIndexed(id)) => assert_eq!(id, "missing"),
            other => panic!("expected NotIndexed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_ingest_failure_degrades_to_zero() {
        let chat = RecordingChat::new("ok");
        let engine = RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(FailingEmbedder),
            chat,
            WindowChunker::new(1000, 100).unwrap(),
        );

        assert_eq!(engine.ingest("v1", "some transcript text").await, 0);
        assert_eq!(engine.store.chunk_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_ingests_zero_chunks() {
        let chat = RecordingChat::new("ok");
        let engine = engine(chat);
        assert_eq!(engine.ingest("v1", "").await, 0);
    }

    /// Store that reports chunks but retrieves nothing, to exercise the
    /// canned empty-retrieval answer.
    struct EmptyQueryStore;

    #[async_trait]
    impl VectorStore for EmptyQueryStore {
        async fn upsert_batch(&self, records: &[ChunkRecord]) -> Result<usize> {
            Ok(records.len())
        }

        async fn query(
            &self,
            _video_id: &str,
            _query_embedding: &[f32],
            _top_k: usize,
        ) -> Result<Vec<RetrievedChunk>> {
            Ok(Vec::new())
        }

        async fn delete_video(&self, _video_id: &str) -> Result<usize> {
            Ok(0)
        }

        async fn chunk_count(&self, _video_id: &str) -> Result<usize> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_empty_retrieval_returns_canned_answer() {
        let chat = RecordingChat::new("should never be called");
        let engine = RagEngine::new(
            Arc::new(EmptyQueryStore),
            Arc::new(TestEmbedder),
            chat.clone(),
            WindowChunker::new(1000, 100).unwrap(),
        );

        let answer = engine.answer("v1", "anything?").await.unwrap();

        assert!(answer.sources.is_empty());
        assert_eq!(answer.answer, Prompts::default().rag.not_found);
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_uses_retrieved_segments() {
        let chat = RecordingChat::new("A fine summary.");
        let engine = engine(chat.clone());
        let text = transcript_600_words();

        let summary = engine
            .summarize_with_context("v1", &text, SummaryType::Brief)
            .await
            .unwrap();

        assert_eq!(summary, "A fine summary.");
        assert!(chat.last_prompt().contains("[Segment 1]"));
        assert!(chat.last_prompt().contains("concise summary"));
    }

    #[tokio::test]
    async fn test_summarize_falls_back_to_raw_head() {
        let chat = RecordingChat::new("A fallback summary.");
        let engine = RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(FailingEmbedder),
            chat.clone(),
            WindowChunker::new(1000, 100).unwrap(),
        );

        let summary = engine
            .summarize_with_context("v1", "raw lecture text", SummaryType::Detailed)
            .await
            .unwrap();

        assert_eq!(summary, "A fallback summary.");
        assert!(chat.last_prompt().contains("raw lecture text"));
        assert!(!chat.last_prompt().contains("[Segment"));
    }
}
