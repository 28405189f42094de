// crates/semdrift-analysis/src/distance.rs
//
// Cosine similarity and distance between two embedding vectors.

use semdrift_core::{l2_norm, DriftError};
use serde::{Deserialize, Serialize};

/// Cosine similarity and its complement for one vector pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Distance {
    /// `1 - cosine_similarity`, in `[0, 2]`.
    pub cosine_distance: f64,
    /// In `[-1, 1]`.
    pub cosine_similarity: f64,
}

/// Compute cosine distance and similarity between two vectors.
///
/// Accumulates in f64. The result is not clamped, so rounding can put the
/// self-distance of a vector a few ulps below zero.
pub fn distance(a: &[f32], b: &[f32]) -> Result<Distance, DriftError> {
    let cosine_similarity = cosine_similarity(a, b)?;
    Ok(Distance {
        cosine_distance: 1.0 - cosine_similarity,
        cosine_similarity,
    })
}

/// Compute cosine similarity between two f32 vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, DriftError> {
    if a.len() != b.len() {
        return Err(DriftError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 {
        return Err(DriftError::ZeroVector("left vector has zero norm".to_string()));
    }
    if norm_b == 0.0 {
        return Err(DriftError::ZeroVector("right vector has zero norm".to_string()));
    }

    Ok(dot / (norm_a * norm_b))
}
