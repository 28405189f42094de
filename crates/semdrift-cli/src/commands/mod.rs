// crates/semdrift-cli/src/commands/mod.rs
//
// Command module declarations for the semdrift CLI, plus the provider and
// cache construction shared by several commands.

pub mod analyze;
pub mod cache;
pub mod measure;
pub mod run;

use semdrift_core::{provider_from_model, DriftError, EmbeddingProvider};
use semdrift_store::EmbeddingStore;

use crate::config::{process_env, PipelineConfig};

/// Construct the configured embedding provider.
pub fn build_provider(config: &PipelineConfig) -> Result<Box<dyn EmbeddingProvider>, DriftError> {
    let provider = provider_from_model(
        &config.embedding_model,
        &config.provider_settings(process_env),
    )?;
    tracing::info!(
        "Using embedding model {} ({} dimensions)",
        provider.model_id(),
        provider.dimensions()
    );
    Ok(provider)
}

/// Open the configured cache, or `None` when caching is disabled.
pub fn open_store(config: &PipelineConfig) -> Result<Option<EmbeddingStore>, DriftError> {
    if !config.enable_cache {
        tracing::info!("Embedding cache disabled");
        return Ok(None);
    }
    EmbeddingStore::open(config.cache_path()).map(Some)
}
