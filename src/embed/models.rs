//! Known sentence-embedding models.

use anyhow::{Result, bail};

/// Backend variant for a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    AllMiniLmL6V2,
    AllMiniLmL12V2,
    ParaphraseMultilingualMpnetBaseV2,
    BgeSmallEnV15,
    BgeBaseEnV15,
    NomicEmbedTextV15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Hugging Face repository id.
    pub id: &'static str,
    pub dims: usize,
    pub kind: ModelKind,
}

impl ModelSpec {
    /// Repository name without the organisation prefix.
    pub fn short_name(&self) -> &'static str {
        self.id.rsplit('/').next().unwrap_or(self.id)
    }
}

pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: "sentence-transformers/paraphrase-multilingual-mpnet-base-v2",
        dims: 768,
        kind: ModelKind::ParaphraseMultilingualMpnetBaseV2,
    },
    ModelSpec {
        id: "sentence-transformers/all-MiniLM-L6-v2",
        dims: 384,
        kind: ModelKind::AllMiniLmL6V2,
    },
    ModelSpec {
        id: "sentence-transformers/all-MiniLM-L12-v2",
        dims: 384,
        kind: ModelKind::AllMiniLmL12V2,
    },
    ModelSpec {
        id: "BAAI/bge-small-en-v1.5",
        dims: 384,
        kind: ModelKind::BgeSmallEnV15,
    },
    ModelSpec {
        id: "BAAI/bge-base-en-v1.5",
        dims: 768,
        kind: ModelKind::BgeBaseEnV15,
    },
    ModelSpec {
        id: "nomic-ai/nomic-embed-text-v1.5",
        dims: 768,
        kind: ModelKind::NomicEmbedTextV15,
    },
];

/// Find a model by full id or short name, ignoring case.
pub fn lookup(name: &str) -> Result<&'static ModelSpec> {
    let wanted = name.trim();
    if let Some(spec) = MODELS.iter().find(|m| {
        m.id.eq_ignore_ascii_case(wanted) || m.short_name().eq_ignore_ascii_case(wanted)
    }) {
        return Ok(spec);
    }
    let known: Vec<&str> = MODELS.iter().map(|m| m.id).collect();
    bail!(
        "unknown embedding model '{wanted}'; known models: {}, hash[:dims]",
        known.join(", ")
    )
}
