//! Local in-process embeddings via fastembed.
//!
//! The model is downloaded on first use and cached; after that no network
//! access is needed. Initialization happens at most once per embedder and
//! is guarded against concurrent first use.

use super::Embedder;
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Default local sentence-embedding model.
const DEFAULT_MODEL: &str = "all-minilm-l6-v2";

/// Local embedder backed by a fastembed sentence-embedding model.
///
/// The model handle is owned by this struct and lazily initialized exactly
/// once; pass the embedder (behind an `Arc`) to whoever needs it rather
/// than sharing ambient global state.
pub struct FastEmbedder {
    model: Arc<Mutex<Option<TextEmbedding>>>,
    model_kind: EmbeddingModel,
    model_name: String,
    dimensions: usize,
}

impl FastEmbedder {
    /// Create a local embedder with the default model.
    pub fn new() -> Self {
        Self {
            model: Arc::new(Mutex::new(None)),
            model_kind: EmbeddingModel::AllMiniLML6V2,
            model_name: DEFAULT_MODEL.to_string(),
            dimensions: 384,
        }
    }

    /// Create a local embedder for a named model.
    pub fn with_model(name: &str) -> Result<Self> {
        let (kind, dimensions) = resolve_model(name)?;
        Ok(Self {
            model: Arc::new(Mutex::new(None)),
            model_kind: kind,
            model_name: name.to_string(),
            dimensions,
        })
    }

    /// The configured model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LektorError::Embedding("Empty embedding result".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model_name))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Encoding {} texts locally", texts.len());

        let model = self.model.clone();
        let kind = self.model_kind.clone();
        let name = self.model_name.clone();
        let texts = texts.to_vec();

        // Model inference is CPU-bound; keep it off the async runtime.
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| LektorError::Embedding(format!("Model lock poisoned: {}", e)))?;

            if guard.is_none() {
                info!("Initializing local embedding model {}", name);
                let loaded = TextEmbedding::try_new(InitOptions::new(kind)).map_err(|e| {
                    LektorError::Embedding(format!(
                        "Failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(loaded);
            }

            match guard.as_mut() {
                Some(loaded) => loaded
                    .embed(texts, None)
                    .map_err(|e| LektorError::Embedding(format!("Local embedding failed: {}", e))),
                None => Err(LektorError::Embedding(
                    "Local embedding model unavailable".to_string(),
                )),
            }
        })
        .await
        .map_err(|e| LektorError::Embedding(format!("Embedding task failed: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Map a model name to the fastembed model and its dimensionality.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Ok((EmbeddingModel::MultilingualE5Small, 384)),
        other => Err(LektorError::Config(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small",
            other
        ))),
    }
}
