//! Speech recognition via the OpenAI transcription API.

use super::SpeechRecognizer;
use crate::error::{LektorError, Result};
use crate::llm::create_client;
use async_openai::types::CreateTranscriptionRequestArgs;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Whisper-based speech recognizer.
pub struct WhisperRecognizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl WhisperRecognizer {
    /// Create a recognizer for the given transcription model.
    ///
    /// Fails with a configuration error when no API credential is set.
    pub fn new(model: &str) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(LektorError::Config(
                "OPENAI_API_KEY not set. Cannot run speech recognition.".to_string(),
            ));
        }

        Ok(Self {
            client: create_client(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn recognize(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .build()
            .map_err(|e| LektorError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| LektorError::Provider(format!("Speech API error: {}", e)))?;

        debug!("Recognized {} chars", response.text.len());
        Ok(response.text.trim().to_string())
    }
}
