// crates/semdrift-core/src/traits.rs

use crate::embedding::EmbeddingModelId;
use crate::error::DriftError;

/// Trait for text embedding backends.
///
/// Implemented by `HashEmbeddingProvider` and `HttpEmbeddingProvider` in this
/// crate, and by call-counting stubs in tests. An instance is constructed
/// once per process and passed explicitly to the store and the runner.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model that produces the vectors. Cache entries are
    /// tagged with it, so two providers must not share an id unless they
    /// produce identical vectors.
    fn model_id(&self) -> &EmbeddingModelId;

    /// Output dimensionality. Constant for the lifetime of the provider.
    fn dimensions(&self) -> usize;

    /// Embed a single non-empty text.
    ///
    /// Fails with `DriftError::EmbeddingFailure` for empty input or when the
    /// underlying model cannot be reached or loaded.
    fn embed(&self, text: &str) -> Result<Vec<f32>, DriftError>;
}
