// crates/semdrift-cli/src/commands/cache.rs
//
// `semdrift cache` — inspect and clear the embedding cache.

use clap::Subcommand;

use semdrift_store::EmbeddingStore;

use crate::config::PipelineConfig;

/// Cache management subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheCmd {
    /// Remove every cached embedding.
    Clear,
    /// Show the number of cached embeddings and their size on disk.
    Stats,
}

/// Run a cache subcommand.
pub fn run(cmd: &CacheCmd, config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = EmbeddingStore::open(config.cache_path())?;
    match cmd {
        CacheCmd::Clear => {
            let removed = store.clear()?;
            println!(
                "Removed {} cached embeddings from {}",
                removed,
                store.root().display()
            );
        }
        CacheCmd::Stats => {
            let stats = store.stats()?;
            println!("Cache directory: {}", store.root().display());
            println!("  Entries:  {}", stats.entries);
            println!(
                "  Size:     {:.1} KB ({} bytes)",
                stats.total_bytes as f64 / 1024.0,
                stats.total_bytes
            );
        }
    }
    Ok(())
}
