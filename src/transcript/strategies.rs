//! Acquisition tier implementations.
//!
//! Caption tiers differ only in how they select a track; the audio tier
//! runs the full download + speech recognition + cleanup pipeline.

use super::{
    join_lines, AcquisitionTier, AudioDownloader, CaptionSource, CaptionTrack, SpeechRecognizer,
    TrackKind,
};
use crate::error::{LektorError, Result};
use crate::llm::ChatModel;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Token budget for the transcript cleanup pass.
const CLEANUP_MAX_TOKENS: u32 = 4000;

/// Does a track's language match the preferred language?
///
/// "en" matches "en" and regional variants like "en-US" or "en-GB".
fn language_matches(track_language: &str, preferred: &str) -> bool {
    track_language == preferred || track_language.starts_with(&format!("{}-", preferred))
}

async fn fetch_and_join(
    source: &Arc<dyn CaptionSource>,
    video_id: &str,
    track: &CaptionTrack,
) -> Result<String> {
    let lines = source.fetch(video_id, track).await?;
    Ok(join_lines(&lines))
}

/// Tier 1: a caption track in the preferred language.
///
/// Manual tracks in the language win over generated ones.
pub struct PreferredLanguageCaptions {
    source: Arc<dyn CaptionSource>,
    language: String,
}

impl PreferredLanguageCaptions {
    pub fn new(source: Arc<dyn CaptionSource>, language: &str) -> Self {
        Self {
            source,
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl AcquisitionTier for PreferredLanguageCaptions {
    fn name(&self) -> &str {
        "preferred-language-captions"
    }

    async fn acquire(&self, video_id: &str) -> Result<String> {
        let tracks = self.source.list_tracks(video_id).await?;

        let track = tracks
            .iter()
            .filter(|t| language_matches(&t.language, &self.language))
            .min_by_key(|t| match t.kind {
                TrackKind::Manual => 0,
                TrackKind::Generated => 1,
            })
            .ok_or_else(|| {
                LektorError::TranscriptUnavailable(format!(
                    "no '{}' caption track for {}",
                    self.language, video_id
                ))
            })?;

        debug!("Fetching {} '{}' track", video_id, track.language);
        fetch_and_join(&self.source, video_id, track).await
    }
}

/// Tier 2: the first manually-created track, any language.
pub struct ManualCaptions {
    source: Arc<dyn CaptionSource>,
}

impl ManualCaptions {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AcquisitionTier for ManualCaptions {
    fn name(&self) -> &str {
        "manual-captions"
    }

    async fn acquire(&self, video_id: &str) -> Result<String> {
        let tracks = self.source.list_tracks(video_id).await?;

        let track = tracks
            .iter()
            .find(|t| t.kind == TrackKind::Manual)
            .ok_or_else(|| {
                LektorError::TranscriptUnavailable(format!("no manual track for {}", video_id))
            })?;

        fetch_and_join(&self.source, video_id, track).await
    }
}

/// Tier 3: an auto-generated track in the preferred language.
pub struct GeneratedCaptions {
    source: Arc<dyn CaptionSource>,
    language: String,
}

impl GeneratedCaptions {
    pub fn new(source: Arc<dyn CaptionSource>, language: &str) -> Self {
        Self {
            source,
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl AcquisitionTier for GeneratedCaptions {
    fn name(&self) -> &str {
        "generated-captions"
    }

    async fn acquire(&self, video_id: &str) -> Result<String> {
        let tracks = self.source.list_tracks(video_id).await?;

        let track = tracks
            .iter()
            .find(|t| t.kind == TrackKind::Generated && language_matches(&t.language, &self.language))
            .ok_or_else(|| {
                LektorError::TranscriptUnavailable(format!(
                    "no generated '{}' track for {}",
                    self.language, video_id
                ))
            })?;

        fetch_and_join(&self.source, video_id, track).await
    }
}

/// Tier 4: the first available track of any language.
pub struct AnyCaptions {
    source: Arc<dyn CaptionSource>,
}

impl AnyCaptions {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AcquisitionTier for AnyCaptions {
    fn name(&self) -> &str {
        "any-captions"
    }

    async fn acquire(&self, video_id: &str) -> Result<String> {
        let tracks = self.source.list_tracks(video_id).await?;

        let track = tracks.first().ok_or_else(|| {
            LektorError::TranscriptUnavailable(format!("no caption tracks for {}", video_id))
        })?;

        fetch_and_join(&self.source, video_id, track).await
    }
}

/// Tier 5: download the audio, run speech recognition, then restore
/// punctuation and capitalization with an LLM pass.
///
/// The downloaded audio lives in a temporary directory that is removed
/// when acquisition finishes, whether it succeeded or not. A cleanup
/// failure degrades to the raw recognized text.
pub struct AudioTranscription {
    downloader: Arc<dyn AudioDownloader>,
    recognizer: Arc<dyn SpeechRecognizer>,
    cleanup: Arc<dyn ChatModel>,
    cleanup_system: String,
}

impl AudioTranscription {
    pub fn new(
        downloader: Arc<dyn AudioDownloader>,
        recognizer: Arc<dyn SpeechRecognizer>,
        cleanup: Arc<dyn ChatModel>,
        cleanup_system: String,
    ) -> Self {
        Self {
            downloader,
            recognizer,
            cleanup,
            cleanup_system,
        }
    }
}

#[async_trait]
impl AcquisitionTier for AudioTranscription {
    fn name(&self) -> &str {
        "audio-transcription"
    }

    #[instrument(skip(self))]
    async fn acquire(&self, video_id: &str) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;

        info!("Downloading audio for {}", video_id);
        let audio_path = self.downloader.download(video_id, temp_dir.path()).await?;

        info!("Running speech recognition");
        let raw = self.recognizer.recognize(&audio_path).await?;

        if raw.trim().is_empty() {
            return Err(LektorError::Transcription(format!(
                "no speech detected in {}",
                video_id
            )));
        }

        match self
            .cleanup
            .complete(&self.cleanup_system, &raw, CLEANUP_MAX_TOKENS)
            .await
        {
            Ok(cleaned) if !cleaned.trim().is_empty() => Ok(cleaned),
            Ok(_) => Ok(raw),
            Err(e) => {
                warn!("Transcript cleanup failed, keeping raw text: {}", e);
                Ok(raw)
            }
        }
    }
}
