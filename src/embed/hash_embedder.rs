//! Feature-hashing embedder.
//!
//! Each lower-cased alphanumeric token is hashed with FNV-1a into one of
//! `dims` buckets; the sign of the bucket update comes from a second bit of
//! the hash so collisions partially cancel. The vector is L2-normalised.
//! It carries no semantics beyond shared vocabulary, but needs no model
//! download and is fully deterministic.

use anyhow::{Result, bail};

use super::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub const DEFAULT_HASH_DIMS: usize = 384;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("hash embedder needs at least one dimension");
        }
        Ok(Self {
            dims,
            name: format!("hash:{dims}"),
        })
    }

    /// Parse `hash` or `hash:<dims>`.
    pub fn parse(name: &str) -> Option<Result<Self>> {
        let rest = name.trim().strip_prefix("hash")?;
        if rest.is_empty() {
            return Some(Self::new(DEFAULT_HASH_DIMS));
        }
        let dims = rest.strip_prefix(':')?;
        Some(match dims.parse::<usize>() {
            Ok(d) => Self::new(d),
            Err(_) => Err(anyhow::anyhow!("invalid hash dimension '{dims}'")),
        })
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (h % self.dims as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
