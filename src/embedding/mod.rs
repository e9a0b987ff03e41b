//! Embedding generation for semantic search and retrieval.
//!
//! Two interchangeable backends: a remote API (OpenAI) and a local
//! in-process model. The remote backend falls back to the local one on
//! provider failure via [`FallbackEmbedder`].

mod fallback;
mod local;
mod openai;

pub use fallback::FallbackEmbedder;
pub use local::FastEmbedder;
pub use openai::OpenAiEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Which embedding backend to use.
///
/// `Local` is the default: ingest avoids the remote API to control cost
/// and quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote embedding API (requires a configured credential).
    Remote,
    /// Local in-process sentence-embedding model.
    #[default]
    Local,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "openai" => Ok(EmbeddingBackend::Remote),
            "local" => Ok(EmbeddingBackend::Local),
            _ => Err(format!("Unknown embedding backend: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingBackend::Remote => write!(f, "remote"),
            EmbeddingBackend::Local => write!(f, "local"),
        }
    }
}

/// Create an embedder for the configured backend.
///
/// The remote backend is wrapped in a [`FallbackEmbedder`] so that a
/// provider failure retries the batch against the local model. A missing
/// credential is a configuration error and is reported immediately.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Local => Ok(Arc::new(FastEmbedder::with_model(&settings.local_model)?)),
        EmbeddingBackend::Remote => {
            let remote: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::with_config(
                &settings.remote_model,
                settings.remote_dimensions as usize,
            )?);
            let local: Arc<dyn Embedder> =
                Arc::new(FastEmbedder::with_model(&settings.local_model)?);
            Ok(Arc::new(FallbackEmbedder::new(vec![remote, local])?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("local".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Local));
        assert_eq!("remote".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Remote));
        assert_eq!("openai".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Remote));
        assert!("vertex".parse::<EmbeddingBackend>().is_err());
    }

    #[test]
    fn test_default_backend_is_local() {
        assert_eq!(EmbeddingBackend::default(), EmbeddingBackend::Local);
    }
}
