// crates/semdrift-core/src/error.rs

use thiserror::Error;

/// Pipeline-wide error types for semdrift.
///
/// Every stage surfaces its failure through this enum; nothing in the core
/// logic recovers locally.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Malformed or out-of-range input record.
    #[error("Validation error in record {index}: {reason}")]
    Validation { index: usize, reason: String },

    /// Embedding model unavailable or failed internally.
    #[error("Embedding failure: {0}")]
    EmbeddingFailure(String),

    /// Cache directory unreadable/unwritable, or a cache entry is corrupt.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Two vectors of different dimensionality were compared.
    #[error("Dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A vector with zero norm has no direction to compare.
    #[error("Zero vector: {0}")]
    ZeroVector(String),

    /// Not enough data points for the requested statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The statistic is mathematically undefined for this sample.
    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),

    /// A chart or report could not be produced or written.
    #[error("Render error: {0}")]
    Render(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl DriftError {
    /// Short name of the pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            DriftError::Validation { .. } => "validation",
            DriftError::EmbeddingFailure(_) => "embedding",
            DriftError::Storage(_) => "cache",
            DriftError::DimensionMismatch { .. } | DriftError::ZeroVector(_) => "distance",
            DriftError::InsufficientData(_) | DriftError::UndefinedStatistic(_) => "statistics",
            DriftError::Render(_) => "report",
            DriftError::Serialization(_) => "serialization",
            DriftError::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for DriftError {
    fn from(e: serde_json::Error) -> Self {
        DriftError::Serialization(e.to_string())
    }
}
