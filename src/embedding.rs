//! Text embedding service.
//!
//! The [`Embedder`] trait is the seam over the embedding model; the vector
//! index store only depends on the trait. [`FastEmbedder`] runs a local
//! fastembed model, moving inference onto the blocking pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Converts text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts, one vector per input in order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Local fastembed-backed embedder.
pub struct FastEmbedder {
    model: Arc<Mutex<Option<TextEmbedding>>>,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model_loaded", &"Dynamic")
            .finish()
    }
}

impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl FastEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: Arc::new(Mutex::new(None)),
        }
    }

    /// Load the model. Must be called once before [`Embedder::embed`].
    pub async fn initialize(&self) -> Result<()> {
        let mut model_guard = self.model.lock().await;
        if model_guard.is_none() {
            info!("Initializing fastembed model (BG-Small-En-V1.5)...");
            let mut options = InitOptions::new(EmbeddingModel::BGESmallENV15);
            options.show_download_progress = true;

            let model = TextEmbedding::try_new(options)?;
            *model_guard = Some(model);
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut model_guard = self.model.lock().await;
        if model_guard.is_some() {
            // TextEmbedding::embed needs &mut self, so take the model out,
            // run it on the blocking pool and put it back.
            let mut owned_model = model_guard
                .take()
                .context("Model unexpectedly None during embed")?;

            let (embeddings_res, returned_model) = tokio::task::spawn_blocking(move || {
                let res = owned_model.embed(texts, None);
                (res, owned_model)
            })
            .await?;

            *model_guard = Some(returned_model);
            embeddings_res.map_err(|e| anyhow::anyhow!(e))
        } else {
            Err(anyhow::anyhow!("FastEmbedder not initialized"))
        }
    }
}

/// Cosine similarity between two vectors; 0.0 when either is zero-length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.5, 0.5, 0.1];
        let score = cosine_similarity(&v, &v);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
