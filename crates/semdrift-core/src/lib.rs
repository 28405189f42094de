// crates/semdrift-core/src/lib.rs
//
// semdrift-core: Core types, errors, and embedding providers for semdrift.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines the experiment record and result types, the workspace error
// taxonomy, content digests used as cache keys, the `EmbeddingProvider`
// trait, and the provider implementations (deterministic hash embeddings
// and OpenAI-compatible HTTP endpoints).

pub mod digest;
pub mod embedding;
pub mod error;
pub mod provider;
pub mod record;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use semdrift_core::ExperimentRecord;`

// Record types
pub use record::{
    default_experiments, parse_experiments, DistanceResult, ExperimentRecord, MAX_CORRUPTION_LEVEL,
};

// Embedding types
pub use embedding::{hash_embedding, l2_norm, EmbeddingModelId};

// Providers
pub use provider::{provider_from_model, HashEmbeddingProvider, HttpEmbeddingProvider, ProviderSettings};

// Error type
pub use error::DriftError;

// Traits
pub use traits::EmbeddingProvider;
