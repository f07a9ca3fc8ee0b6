use std::path::PathBuf;

use anyhow::{Result, anyhow};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use super::models::{ModelKind, ModelSpec};

fn variant(kind: ModelKind) -> EmbeddingModel {
    match kind {
        ModelKind::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
        ModelKind::AllMiniLmL12V2 => EmbeddingModel::AllMiniLML12V2,
        ModelKind::ParaphraseMultilingualMpnetBaseV2 => EmbeddingModel::ParaphraseMLMpnetBaseV2,
        ModelKind::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
        ModelKind::BgeBaseEnV15 => EmbeddingModel::BGEBaseENV15,
        ModelKind::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
    }
}

/// Where downloaded model files live.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("es-semantic")
        .join("models")
}

/// ONNX sentence embedder backed by fastembed.
pub struct FastEmbedder {
    model: TextEmbedding,
    spec: &'static ModelSpec,
}

impl FastEmbedder {
    /// Load `spec`, downloading the model into `cache_dir` on first use.
    pub fn load(spec: &'static ModelSpec, cache_dir: PathBuf) -> Result<Self> {
        tracing::debug!(model = spec.id, cache_dir = %cache_dir.display(), "loading embedding model");
        let options = InitOptions::new(variant(spec.kind))
            .with_cache_dir(cache_dir)
            .with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| anyhow!("failed to load embedding model {}: {e}", spec.id))?;
        Ok(Self { model, spec })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut out = self
            .model
            .embed(vec![text], None)
            .map_err(|e| anyhow!("embedding failed: {e}"))?;
        out.pop()
            .ok_or_else(|| anyhow!("embedding model returned no vector"))
    }

    fn dimension(&self) -> usize {
        self.spec.dims
    }

    fn model_name(&self) -> &str {
        self.spec.id
    }
}
