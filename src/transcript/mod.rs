//! Transcript acquisition for Lektor.
//!
//! A transcript is acquired through an ordered chain of tiers: official
//! captions in the preferred language, then a manually-created track, then
//! an auto-generated track, then any track at all, and finally audio
//! download plus speech recognition. The first tier that produces text
//! wins; only when every tier is exhausted does acquisition fail.

mod audio;
mod captions;
mod speech;
mod strategies;

pub use audio::YtDlpAudioDownloader;
pub use captions::{extract_video_id, YtDlpCaptionSource};
pub use speech::WhisperRecognizer;
pub use strategies::{
    AnyCaptions, AudioTranscription, GeneratedCaptions, ManualCaptions,
    PreferredLanguageCaptions,
};

use crate::error::{LektorError, Result};
use crate::llm::ChatModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// How a caption track was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Manually created by the uploader.
    Manual,
    /// Auto-generated by the platform.
    Generated,
}

/// An available caption track for a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// BCP-47-ish language code (e.g. "en", "en-US").
    pub language: String,
    /// Manual or auto-generated.
    pub kind: TrackKind,
}

/// One line of a caption track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionLine {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
}

/// Trait for caption/transcript sources.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List all caption tracks available for a video.
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Fetch the lines of one track.
    async fn fetch(&self, video_id: &str, track: &CaptionTrack) -> Result<Vec<CaptionLine>>;
}

/// Trait for audio downloaders.
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Download a video's audio into `output_dir` and return the file path.
    async fn download(&self, video_id: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// Trait for speech-to-text recognizers.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize speech in a local audio file and return the raw text.
    async fn recognize(&self, audio_path: &Path) -> Result<String>;
}

/// Join caption lines into a single text blob.
pub fn join_lines(lines: &[CaptionLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One tier of the acquisition chain.
#[async_trait]
pub trait AcquisitionTier: Send + Sync {
    /// Short tier name for logging.
    fn name(&self) -> &str;

    /// Attempt to acquire a transcript for the video.
    async fn acquire(&self, video_id: &str) -> Result<String>;
}

/// Multi-tier transcript fetcher.
///
/// Tiers are tried in order; a tier's failure is logged and the next tier
/// is attempted. Acquisition fails only when every tier is exhausted.
pub struct TranscriptFetcher {
    tiers: Vec<Box<dyn AcquisitionTier>>,
}

impl TranscriptFetcher {
    /// Create a fetcher from an ordered list of tiers.
    pub fn new(tiers: Vec<Box<dyn AcquisitionTier>>) -> Self {
        Self { tiers }
    }

    /// Create the standard five-tier chain.
    pub fn standard(
        source: Arc<dyn CaptionSource>,
        downloader: Arc<dyn AudioDownloader>,
        recognizer: Arc<dyn SpeechRecognizer>,
        cleanup: Arc<dyn ChatModel>,
        cleanup_system: String,
        preferred_language: &str,
    ) -> Self {
        Self::new(vec![
            Box::new(PreferredLanguageCaptions::new(
                source.clone(),
                preferred_language,
            )),
            Box::new(ManualCaptions::new(source.clone())),
            Box::new(GeneratedCaptions::new(source.clone(), preferred_language)),
            Box::new(AnyCaptions::new(source)),
            Box::new(AudioTranscription::new(
                downloader, recognizer, cleanup, cleanup_system,
            )),
        ])
    }

    /// Acquire a transcript, trying each tier in order.
    #[instrument(skip(self))]
    pub async fn acquire(&self, video_id: &str) -> Result<String> {
        for tier in &self.tiers {
            match tier.acquire(video_id).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("Acquired transcript via tier '{}'", tier.name());
                    return Ok(text);
                }
                Ok(_) => {
                    warn!("Tier '{}' returned an empty transcript", tier.name());
                }
                Err(e) => {
                    warn!("Tier '{}' failed: {}", tier.name(), e);
                }
            }
        }

        Err(LektorError::TranscriptUnavailable(video_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTier {
        name: String,
        calls: Arc<AtomicUsize>,
        result: Option<String>,
    }

    #[async_trait]
    impl AcquisitionTier for CountingTier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn acquire(&self, _video_id: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Some(text) => Ok(text.clone()),
                None => Err(LektorError::Provider("tier down".to_string())),
            }
        }
    }

    fn tier(name: &str, calls: &Arc<AtomicUsize>, result: Option<&str>) -> Box<dyn AcquisitionTier> {
        Box::new(CountingTier {
            name: name.to_string(),
            calls: calls.clone(),
            result: result.map(|s| s.to_string()),
        })
    }

    #[tokio::test]
    async fn test_first_success_wins_and_later_tiers_untouched() {
        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));
        let c3 = Arc::new(AtomicUsize::new(0));

        let fetcher = TranscriptFetcher::new(vec![
            tier("captions", &c1, None),
            tier("manual", &c2, Some("second tier transcript")),
            tier("generated", &c3, Some("third tier transcript")),
        ]);

        let text = fetcher.acquire("vid").await.unwrap();

        assert_eq!(text, "second tier transcript");
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
        assert_eq!(c3.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_tier_output_is_skipped() {
        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));

        let fetcher = TranscriptFetcher::new(vec![
            tier("captions", &c1, Some("   ")),
            tier("manual", &c2, Some("real text")),
        ]);

        assert_eq!(fetcher.acquire("vid").await.unwrap(), "real text");
    }

    #[tokio::test]
    async fn test_all_tiers_exhausted() {
        let c1 = Arc::new(AtomicUsize::new(0));

        let fetcher = TranscriptFetcher::new(vec![tier("captions", &c1, None)]);

        match fetcher.acquire("vid").await {
            Err(LektorError::TranscriptUnavailable(id)) => assert_eq!(id, "vid"),
            other => panic!("expected TranscriptUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_join_lines() {
        let lines = vec![
            CaptionLine {
                text: "hello".to_string(),
                start_seconds: 0.0,
            },
            CaptionLine {
                text: "world".to_string(),
                start_seconds: 1.5,
            },
        ];
        assert_eq!(join_lines(&lines), "hello world");
    }
}
