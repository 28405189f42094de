// crates/semdrift-cli/src/main.rs
//
// CLI entrypoint for semdrift.
//
// Provides subcommands for running the measurement pipeline over a batch of
// experiments, re-analyzing a results report, measuring a single text pair,
// and managing the embedding cache.

mod commands;
mod config;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::analyze::AnalyzeCmd;
use commands::cache::CacheCmd;
use commands::measure::MeasureCmd;
use commands::run::RunCmd;
use config::{process_env, CliOverrides, PipelineConfig};
use semdrift_core::DriftError;

/// semdrift — semantic drift measurement for translation chains.
#[derive(Parser, Debug)]
#[command(
    name = "semdrift",
    version = "0.1.0",
    about = "Measure semantic drift between original and round-tripped texts using cached embeddings"
)]
struct Cli {
    /// Path to the TOML configuration file (default: ~/.semdrift/config.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding cached embeddings.
    #[arg(long, short = 'c', global = true)]
    cache_dir: Option<String>,

    /// Embedding model as provider/name (e.g. hash/sha256-384).
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Measure every experiment and write the report, document, and chart.
    Run(RunCmd),

    /// Print statistics for a previously written results report.
    Analyze(AnalyzeCmd),

    /// Measure the distance between a single pair of texts.
    Measure(MeasureCmd),

    /// Embedding cache management: clear, stats.
    #[command(subcommand)]
    Cache(CacheCmd),
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            cache_dir: self.cache_dir.clone(),
            embedding_model: self.model.clone(),
            ..Default::default()
        };
        if let Commands::Run(run) = &self.command {
            overrides.output = run.output.clone();
            overrides.chart = run.chart.clone();
            overrides.markdown = run.markdown.clone();
            overrides.no_cache = run.no_cache;
        }
        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_message(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// `error: <stage>: <message>` for pipeline errors, `error: <message>` otherwise.
fn error_message(e: &(dyn std::error::Error + 'static)) -> String {
    match e.downcast_ref::<DriftError>() {
        Some(drift) => format!("error: {}: {}", drift.stage(), drift),
        None => format!("error: {}", e),
    }
}

fn execute(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::resolve(cli.config.as_deref(), &cli.overrides(), process_env)?;

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();
    tracing::debug!("Resolved configuration: {:?}", config);

    match &cli.command {
        Commands::Run(cmd) => commands::run::run(cmd, &config)?,
        Commands::Analyze(cmd) => commands::analyze::run(cmd)?,
        Commands::Measure(cmd) => commands::measure::run(cmd, &config)?,
        Commands::Cache(cmd) => commands::cache::run(cmd, &config)?,
    }

    Ok(())
}
