//! Pipeline orchestrator for Lektor.
//!
//! Wires configuration into concrete components and coordinates the flow
//! from transcript acquisition to indexing, answering, and summarization.

use crate::chunking::WindowChunker;
use crate::config::{Prompts, Settings};
use crate::embedding::create_embedder;
use crate::error::{LektorError, Result};
use crate::llm::{ChatModel, OpenAiChat};
use crate::rag::{RagAnswer, RagEngine, SummaryType};
use crate::transcript::{
    extract_video_id, CaptionSource, TranscriptFetcher, WhisperRecognizer, YtDlpAudioDownloader,
    YtDlpCaptionSource,
};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Lektor pipeline.
pub struct Orchestrator {
    settings: Settings,
    fetcher: TranscriptFetcher,
    engine: RagEngine,
}

impl Orchestrator {
    /// Create an orchestrator with the standard component wiring.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&settings.llm)?);
        let embedder = create_embedder(&settings.embedding)?;
        let store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);
        let chunker = WindowChunker::new(
            settings.chunking.max_window_tokens,
            settings.chunking.overlap_tokens,
        )?;

        let engine = RagEngine::new(store, embedder, chat.clone(), chunker)
            .with_prompts(prompts.clone())
            .with_retrieval(settings.rag.top_k, settings.rag.preview_chars)
            .with_max_tokens(settings.llm.max_tokens);

        let source: Arc<dyn CaptionSource> = Arc::new(YtDlpCaptionSource::new());
        let fetcher = TranscriptFetcher::standard(
            source,
            Arc::new(YtDlpAudioDownloader::new()),
            Arc::new(WhisperRecognizer::new(&settings.transcript.whisper_model)?),
            chat,
            prompts.cleanup.system.clone(),
            &settings.transcript.preferred_language,
        );

        Ok(Self {
            settings,
            fetcher,
            engine,
        })
    }

    /// Create an orchestrator from pre-built components.
    pub fn with_components(
        settings: Settings,
        fetcher: TranscriptFetcher,
        engine: RagEngine,
    ) -> Self {
        Self {
            settings,
            fetcher,
            engine,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the RAG engine.
    pub fn engine(&self) -> &RagEngine {
        &self.engine
    }

    /// Resolve a URL or bare id into a video id.
    fn resolve_video_id(input: &str) -> Result<String> {
        extract_video_id(input).ok_or_else(|| {
            LektorError::InvalidInput(format!("Could not parse video URL or id: {}", input))
        })
    }

    /// Acquire a transcript for a video URL or id.
    #[instrument(skip(self))]
    pub async fn acquire_transcript(&self, input: &str) -> Result<(String, String)> {
        let video_id = Self::resolve_video_id(input)?;
        let transcript = self.fetcher.acquire(&video_id).await?;
        Ok((video_id, transcript))
    }

    /// Acquire a transcript and index it. Returns the ingest report.
    #[instrument(skip(self))]
    pub async fn ingest_video(&self, input: &str) -> Result<IngestReport> {
        let (video_id, transcript) = self.acquire_transcript(input).await?;

        info!("Ingesting transcript for {}", video_id);
        let chunks_indexed = self.engine.ingest(&video_id, &transcript).await;

        Ok(IngestReport {
            video_id,
            chunks_indexed,
        })
    }

    /// Answer a question about an indexed video.
    ///
    /// Fails with `NotIndexed` when the video hasn't been ingested yet.
    pub async fn ask_video(&self, input: &str, question: &str) -> Result<RagAnswer> {
        let video_id = Self::resolve_video_id(input)?;
        self.engine.answer(&video_id, question).await
    }

    /// Acquire, index, and summarize a video.
    #[instrument(skip(self))]
    pub async fn summarize_video(
        &self,
        input: &str,
        summary_type: SummaryType,
    ) -> Result<VideoSummary> {
        let (video_id, transcript) = self.acquire_transcript(input).await?;

        let text = self
            .engine
            .summarize_with_context(&video_id, &transcript, summary_type)
            .await?;

        Ok(VideoSummary {
            video_id,
            summary_type,
            text,
        })
    }
}

/// Result of ingesting a video.
#[derive(Debug)]
pub struct IngestReport {
    /// Video id.
    pub video_id: String,
    /// Number of chunks indexed (0 when ingest degraded).
    pub chunks_indexed: usize,
}

/// A generated video summary.
#[derive(Debug)]
pub struct VideoSummary {
    /// Video id.
    pub video_id: String,
    /// Which kind of summary was generated.
    pub summary_type: SummaryType,
    /// The summary text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::transcript::AcquisitionTier;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    struct StaticTier {
        text: String,
    }

    #[async_trait]
    impl AcquisitionTier for StaticTier {
        fn name(&self) -> &str {
            "static"
        }

        async fn acquire(&self, _video_id: &str) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    struct HashEmbedder;

    #[async_trait]
    impl Embedder for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 4];
            for (i, b) in text.bytes().enumerate() {
                v[i % 4] += b as f32;
            }
            Ok(v)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    struct StaticChat {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for StaticChat {
        async fn complete(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    fn orchestrator(transcript: &str, reply: &str) -> Orchestrator {
        let engine = RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(HashEmbedder),
            Arc::new(StaticChat {
                reply: reply.to_string(),
            }),
            WindowChunker::new(1000, 100).unwrap(),
        );

        let fetcher = TranscriptFetcher::new(vec![Box::new(StaticTier {
            text: transcript.to_string(),
        })]);

        Orchestrator::with_components(Settings::default(), fetcher, engine)
    }

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let orchestrator = orchestrator("a lecture about borrow checking in rust", "It is about Rust.");

        let report = orchestrator.ingest_video("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(report.video_id, "dQw4w9WgXcQ");
        assert_eq!(report.chunks_indexed, 1);

        let answer = orchestrator
            .ask_video("https://youtu.be/dQw4w9WgXcQ", "what is it about?")
            .await
            .unwrap();
        assert_eq!(answer.answer, "It is about Rust.");
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_ask_before_ingest_is_not_indexed() {
        let orchestrator = orchestrator("transcript", "reply");

        match orchestrator.ask_video("dQw4w9WgXcQ", "anything?").await {
            Err(LektorError::NotIndexed(_)) => {}
            other => panic!("expected NotIndexed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_summarize_video() {
        let orchestrator = orchestrator("a lecture about databases", "Summary text.");

        let summary = orchestrator
            .summarize_video("dQw4w9WgXcQ", SummaryType::Brief)
            .await
            .unwrap();

        assert_eq!(summary.text, "Summary text.");
        assert_eq!(summary.summary_type, SummaryType::Brief);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let orchestrator = orchestrator("transcript", "reply");
        assert!(orchestrator.ask_video("not a url", "q").await.is_err());
    }
}
