// crates/semdrift-core/src/embedding.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DriftError;

/// Identifies a specific embedding model, written as `provider/name`
/// (e.g. `openai/text-embedding-3-small`, `hash/sha256-384`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EmbeddingModelId {
    /// Model family (e.g., "openai", "local", "hash").
    pub provider: String,
    /// Model name (e.g., "text-embedding-3-small").
    pub name: String,
}

impl EmbeddingModelId {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EmbeddingModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.name)
    }
}

impl FromStr for EmbeddingModelId {
    type Err = DriftError;

    /// Parse `provider/name`. The name may itself contain slashes
    /// (`local/sentence-transformers/all-MiniLM-L6-v2`); only the first one
    /// separates the provider.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((provider, name)) if !provider.is_empty() && !name.is_empty() => {
                Ok(Self::new(provider, name))
            }
            _ => Err(DriftError::Config(format!(
                "Model id must look like provider/name, got {:?}",
                s
            ))),
        }
    }
}

/// Deterministic pseudo-embedding: hash text + dimension index to produce a
/// reproducible float vector, then L2-normalize. Identical text always yields
/// an identical vector (cosine similarity ~1.0). No ML model required.
pub fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    use sha2::{Digest, Sha256};

    let mut raw = Vec::with_capacity(dimensions);
    for i in 0..dimensions {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update((i as u64).to_le_bytes());
        let hash = hasher.finalize();
        // Interpret first 4 bytes as u32, map to [-1, 1]
        let bits = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]);
        let val = (bits as f64 / u32::MAX as f64) * 2.0 - 1.0;
        raw.push(val as f32);
    }

    let norm = l2_norm(&raw) as f32;
    if norm > 0.0 {
        for v in raw.iter_mut() {
            *v /= norm;
        }
    }

    raw
}

/// Euclidean norm of a vector, accumulated in f64.
pub fn l2_norm(values: &[f32]) -> f64 {
    values
        .iter()
        .map(|&x| (x as f64) * (x as f64))
        .sum::<f64>()
        .sqrt()
}
