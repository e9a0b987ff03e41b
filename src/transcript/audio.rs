//! Audio download via yt-dlp.

use super::AudioDownloader;
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Audio downloader that shells out to yt-dlp.
pub struct YtDlpAudioDownloader;

impl YtDlpAudioDownloader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YtDlpAudioDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDownloader for YtDlpAudioDownloader {
    #[instrument(skip(self, output_dir))]
    async fn download(&self, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let template = output_dir.join(format!("{}.%(ext)s", video_id));

        info!("Downloading audio from {}", url);

        let result = Command::new("yt-dlp")
            .arg("--extract-audio")
            .arg("--audio-format").arg("mp3")
            .arg("--audio-quality").arg("0")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(&url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LektorError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(LektorError::ToolFailed(format!(
                    "yt-dlp execution failed: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LektorError::ToolFailed(format!("yt-dlp failed: {stderr}")));
        }

        find_audio_file(output_dir, video_id)
    }
}

/// Locate a downloaded audio file by video id.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    // Common audio formats that yt-dlp may produce
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir)
        .map_err(|e| LektorError::ToolFailed(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(LektorError::ToolFailed(
        "Audio file not found after download".into(),
    ))
}
