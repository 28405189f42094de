// crates/semdrift-cli/src/commands/measure.rs
//
// `semdrift measure` — distance between a single pair of texts, as JSON.

use clap::Args;
use serde::Serialize;

use semdrift_analysis::ExperimentRunner;

use crate::commands::{build_provider, open_store};
use crate::config::PipelineConfig;
use crate::output::format_json;

/// Measure the semantic distance between two texts.
#[derive(Debug, Args)]
pub struct MeasureCmd {
    /// Text before the transformation chain.
    #[arg(long)]
    pub original: String,

    /// Text after the transformation chain.
    #[arg(long = "final")]
    pub final_text: String,
}

#[derive(Serialize)]
struct Measurement {
    model_id: String,
    cosine_distance: f64,
    cosine_similarity: f64,
}

/// Run the measure command.
pub fn run(cmd: &MeasureCmd, config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = build_provider(config)?;
    let store = open_store(config)?;
    let runner = match &store {
        Some(store) => ExperimentRunner::new(provider.as_ref(), store),
        None => ExperimentRunner::uncached(provider.as_ref()),
    };

    let distance = runner.measure(&cmd.original, &cmd.final_text)?;
    let measurement = Measurement {
        model_id: provider.model_id().to_string(),
        cosine_distance: distance.cosine_distance,
        cosine_similarity: distance.cosine_similarity,
    };
    println!("{}", format_json(&measurement));
    Ok(())
}
