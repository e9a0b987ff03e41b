//! Error types for Lektor.

use thiserror::Error;

/// Library-level error type for Lektor operations.
#[derive(Error, Debug)]
pub enum LektorError {
    /// Missing or invalid configuration (e.g. an absent API credential).
    /// Fatal: never subject to a provider fallback.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient failure from an external provider (network, quota, auth).
    /// Subject to the documented fallback chains before surfacing.
    #[error("Provider error: {0}")]
    Provider(String),

    /// All transcript acquisition tiers were exhausted for a video.
    #[error("No transcript or captions available: {0}")]
    TranscriptUnavailable(String),

    /// A query was attempted against a video that has no indexed chunks.
    /// Actionable by the caller via re-ingest.
    #[error("Video not indexed, please re-process it: {0}")]
    NotIndexed(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Lektor operations.
pub type Result<T> = std::result::Result<T, LektorError>;
