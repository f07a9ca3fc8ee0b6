//! Text embedding.
//!
//! - **[`fastembed_embedder`]**: ONNX sentence-transformer models via fastembed.
//! - **[`hash_embedder`]**: FNV-1a feature hashing (offline, deterministic).
//! - **[`models`]**: registry of supported model ids and their dimensions.

pub mod fastembed_embedder;
pub mod hash_embedder;
pub mod models;

use anyhow::Result;

pub use fastembed_embedder::FastEmbedder;
pub use hash_embedder::HashEmbedder;

/// Turns text into a fixed-length vector.
pub trait Embedder: Send {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Vector length produced by `name`, without loading the model.
pub fn model_dimension(name: &str) -> Result<usize> {
    if let Some(hash) = HashEmbedder::parse(name) {
        return Ok(hash?.dimension());
    }
    Ok(models::lookup(name)?.dims)
}

/// Build the embedder for `name` (`hash[:dims]` or a registered model id).
pub fn create_embedder(name: &str) -> Result<Box<dyn Embedder>> {
    if let Some(hash) = HashEmbedder::parse(name) {
        return Ok(Box::new(hash?));
    }
    let spec = models::lookup(name)?;
    let embedder = FastEmbedder::load(spec, fastembed_embedder::default_cache_dir())?;
    Ok(Box::new(embedder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_without_loading() {
        assert_eq!(model_dimension("hash:32").unwrap(), 32);
        assert_eq!(model_dimension("bge-small-en-v1.5").unwrap(), 384);
        assert!(model_dimension("nope").is_err());
    }

    #[test]
    fn creates_hash_embedder() {
        let mut e = create_embedder("hash:16").unwrap();
        assert_eq!(e.model_name(), "hash:16");
        assert_eq!(e.embed("hello").unwrap().len(), 16);
    }
}
