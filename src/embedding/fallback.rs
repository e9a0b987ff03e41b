//! Ordered provider fallback for embedding generation.
//!
//! Providers are tried in sequence; the first success short-circuits.
//! A batch is always retried whole against the next provider so the
//! returned vectors all come from a single backend.

use super::Embedder;
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Embedder that tries an ordered list of providers.
///
/// `dimensions()` reports the primary provider's dimensionality; after a
/// fallback the vectors may have a different length, so callers must not
/// assume dimensional compatibility across calls.
pub struct FallbackEmbedder {
    providers: Vec<Arc<dyn Embedder>>,
}

impl FallbackEmbedder {
    /// Create a fallback chain from an ordered, non-empty provider list.
    pub fn new(providers: Vec<Arc<dyn Embedder>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(LektorError::InvalidInput(
                "fallback embedder requires at least one provider".to_string(),
            ));
        }
        Ok(Self { providers })
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LektorError::Embedding("Empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_err = None;

        for (i, provider) in self.providers.iter().enumerate() {
            match provider.embed_batch(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    if i + 1 < self.providers.len() {
                        warn!("Embedding provider {} failed, trying next: {}", i, e);
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| LektorError::Embedding("No embedding providers".to_string())))
    }

    fn dimensions(&self) -> usize {
        self.providers[0].dimensions()
    }
}
