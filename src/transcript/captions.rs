//! YouTube caption source backed by yt-dlp.
//!
//! Track listings come from `yt-dlp --dump-json`; individual tracks are
//! fetched in the json3 format and parsed into caption lines.

use super::{CaptionLine, CaptionSource, CaptionTrack, TrackKind};
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Extract a video id from a YouTube URL or bare 11-character id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let video_id_regex = Regex::new(
        r"(?x)
        (?:
            # Full YouTube URLs
            (?:https?://)?
            (?:www\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .ok()?;

    let caps = video_id_regex.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Caption source that shells out to yt-dlp.
pub struct YtDlpCaptionSource;

impl YtDlpCaptionSource {
    pub fn new() -> Self {
        Self
    }

    fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }

    /// Run `yt-dlp --dump-json` for a video.
    async fn dump_info(&self, video_id: &str) -> Result<serde_json::Value> {
        let output = Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                &Self::watch_url(video_id),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LektorError::ToolNotFound("yt-dlp".to_string())
                } else {
                    LektorError::ToolFailed(format!("yt-dlp execution failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LektorError::ToolFailed(format!(
                "yt-dlp failed for {}: {}",
                video_id, stderr
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&json_str)
            .map_err(|e| LektorError::ToolFailed(format!("Failed to parse yt-dlp output: {}", e)))
    }

    /// Find the downloaded json3 subtitle file in a directory.
    fn find_subtitle_file(dir: &Path) -> Result<std::path::PathBuf> {
        let entries = std::fs::read_dir(dir)?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json3") {
                return Ok(path);
            }
        }

        Err(LektorError::ToolFailed(
            "Subtitle file not found after download".to_string(),
        ))
    }
}

impl Default for YtDlpCaptionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    #[instrument(skip(self))]
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let info = self.dump_info(video_id).await?;
        let mut tracks = Vec::new();

        // Manual tracks first so callers scanning in order prefer them.
        if let Some(subtitles) = info["subtitles"].as_object() {
            for language in subtitles.keys() {
                tracks.push(CaptionTrack {
                    language: language.clone(),
                    kind: TrackKind::Manual,
                });
            }
        }

        if let Some(auto) = info["automatic_captions"].as_object() {
            for language in auto.keys() {
                tracks.push(CaptionTrack {
                    language: language.clone(),
                    kind: TrackKind::Generated,
                });
            }
        }

        debug!("Found {} caption tracks for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    #[instrument(skip(self, track), fields(language = %track.language))]
    async fn fetch(&self, video_id: &str, track: &CaptionTrack) -> Result<Vec<CaptionLine>> {
        let temp_dir = tempfile::tempdir()?;
        let template = temp_dir.path().join("track");

        let sub_flag = match track.kind {
            TrackKind::Manual => "--write-subs",
            TrackKind::Generated => "--write-auto-subs",
        };

        let output = Command::new("yt-dlp")
            .args([
                "--skip-download",
                sub_flag,
                "--sub-langs",
                &track.language,
                "--sub-format",
                "json3",
                "--no-warnings",
                "--output",
                template.to_str().unwrap_or("track"),
                &Self::watch_url(video_id),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LektorError::ToolNotFound("yt-dlp".to_string())
                } else {
                    LektorError::ToolFailed(format!("yt-dlp execution failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LektorError::ToolFailed(format!(
                "Caption download failed: {}",
                stderr
            )));
        }

        let subtitle_path = Self::find_subtitle_file(temp_dir.path())?;
        let content = std::fs::read_to_string(&subtitle_path)?;
        let parsed: serde_json::Value = serde_json::from_str(&content)?;

        Ok(parse_json3(&parsed))
    }
}

/// Parse a json3 caption document into lines.
///
/// Events without text segments (styling/window events) are skipped.
fn parse_json3(doc: &serde_json::Value) -> Vec<CaptionLine> {
    let events = match doc["events"].as_array() {
        Some(events) => events,
        None => return Vec::new(),
    };

    events
        .iter()
        .filter_map(|event| {
            let segs = event["segs"].as_array()?;
            let text: String = segs
                .iter()
                .filter_map(|seg| seg["utf8"].as_str())
                .collect::<Vec<_>>()
                .join("");
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }

            Some(CaptionLine {
                text,
                start_seconds: event["tStartMs"].as_f64().unwrap_or(0.0) / 1000.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_parse_json3() {
        let doc: serde_json::Value = serde_json::from_str(
            r#"{
                "events": [
                    {"tStartMs": 0, "segs": [{"utf8": "welcome "}, {"utf8": "back"}]},
                    {"tStartMs": 1200},
                    {"tStartMs": 2500, "segs": [{"utf8": "\n"}]},
                    {"tStartMs": 4000, "segs": [{"utf8": "to the lecture"}]}
                ]
            }"#,
        )
        .unwrap();

        let lines = parse_json3(&doc);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "welcome back");
        assert_eq!(lines[0].start_seconds, 0.0);
        assert_eq!(lines[1].text, "to the lecture");
        assert_eq!(lines[1].start_seconds, 4.0);
    }

    #[test]
    fn test_parse_json3_empty_document() {
        let doc: serde_json::Value = serde_json::from_str("{}").unwrap();
        assert!(parse_json3(&doc).is_empty());
    }
}
