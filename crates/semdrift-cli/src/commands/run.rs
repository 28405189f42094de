// crates/semdrift-cli/src/commands/run.rs
//
// `semdrift run` — measure every experiment record and write the report,
// Markdown document, and chart.

use std::fs;

use clap::Args;

use semdrift_analysis::report::write_markdown;
use semdrift_analysis::{
    format_p_value, to_chart, to_structured, write_json, ErrorPolicy, ExperimentRunner,
    RunOutcome, SummaryStatistics,
};
use semdrift_core::{default_experiments, parse_experiments, DriftError, ExperimentRecord};
use semdrift_store::EmbeddingStore;

use crate::commands::{build_provider, open_store};
use crate::config::PipelineConfig;
use crate::output::{format_table, FailureRow, ResultRow};

/// Run the measurement pipeline over a batch of experiments.
#[derive(Debug, Args)]
pub struct RunCmd {
    /// Experiments JSON: {"experiments": [...]} or a bare list. The built-in
    /// six-sentence fixture is used when omitted.
    #[arg(long, short = 'i')]
    pub input: Option<String>,

    /// Path of the JSON results report.
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// Path of the SVG chart.
    #[arg(long, short = 'g')]
    pub chart: Option<String>,

    /// Path of the Markdown experiment data document.
    #[arg(long)]
    pub markdown: Option<String>,

    /// Remove every cached embedding before running.
    #[arg(long)]
    pub clear_cache: bool,

    /// Compute every embedding without reading or writing the cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Keep going past failing records and report them at the end.
    #[arg(long)]
    pub collect_errors: bool,
}

/// Run the run command.
pub fn run(cmd: &RunCmd, config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_records(cmd.input.as_deref())?;
    let provider = build_provider(config)?;

    if cmd.clear_cache {
        let removed = EmbeddingStore::open(config.cache_path())?.clear()?;
        println!("Cleared {} cached embeddings", removed);
    }
    let store = open_store(config)?;

    let policy = if cmd.collect_errors {
        ErrorPolicy::Collect
    } else {
        ErrorPolicy::Stop
    };
    let runner = match &store {
        Some(store) => ExperimentRunner::new(provider.as_ref(), store),
        None => ExperimentRunner::uncached(provider.as_ref()),
    }
    .with_policy(policy);

    let outcome = runner.run(&records)?;
    print_outcome(&outcome);

    let model_id = provider.model_id().to_string();
    let report = to_structured(&outcome.results, &model_id)?;

    let output = config.output_path();
    write_json(&report, &output)?;
    println!("Results written to {}", output.display());

    let markdown = config.markdown_path();
    write_markdown(&report, &markdown)?;
    println!("Experiment data written to {}", markdown.display());

    if outcome.results.is_empty() {
        tracing::warn!("No records were measured; skipping chart");
    } else {
        let chart = config.chart_path();
        to_chart(&outcome.results, &chart)?;
        println!("Chart written to {}", chart.display());
    }

    println!();
    match &report.summary {
        Some(s) => print_summary(s, &model_id),
        None => println!(
            "No summary: {} record(s) measured, at least two are needed",
            report.results.len()
        ),
    }

    if let Some(store) = &store {
        let stats = store.stats()?;
        println!(
            "  Cache:          {} entries, {:.1} KB in {}",
            stats.entries,
            stats.total_bytes as f64 / 1024.0,
            store.root().display()
        );
    }

    if !outcome.failures.is_empty() {
        return Err(format!(
            "{} of {} records failed",
            outcome.failures.len(),
            records.len()
        )
        .into());
    }
    Ok(())
}

/// Read experiments from `input`, or fall back to the built-in fixture.
fn load_records(input: Option<&str>) -> Result<Vec<ExperimentRecord>, DriftError> {
    match input {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| {
                DriftError::Serialization(format!("Failed to read input {}: {}", path, e))
            })?;
            let records = parse_experiments(&json)?;
            println!("Loaded {} experiments from {}", records.len(), path);
            Ok(records)
        }
        None => {
            let records = default_experiments();
            println!("Using built-in experiments ({} records)", records.len());
            Ok(records)
        }
    }
}

fn print_summary(s: &SummaryStatistics, model_id: &str) {
    println!("Summary ({} records, model {})", s.count, model_id);
    println!("  Mean distance:  {:.6} (std dev {:.6})", s.mean, s.stdev);
    println!("  Min distance:   {:.6} at {}%", s.min, s.min_level);
    println!("  Max distance:   {:.6} at {}%", s.max, s.max_level);
    if let Some(reg) = &s.regression {
        println!(
            "  Trend:          {:+.6} per error point, R² {:.4} ({}), p = {}",
            reg.slope,
            reg.r_squared,
            reg.fit_quality(),
            format_p_value(reg.p_value)
        );
        println!("  Linearity:      {}", reg.linearity().conclusion);
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let rows: Vec<ResultRow> = outcome.results.iter().map(ResultRow::from).collect();
    println!();
    println!("{}", format_table(&rows));

    if !outcome.failures.is_empty() {
        let failures: Vec<FailureRow> = outcome.failures.iter().map(FailureRow::from).collect();
        println!();
        println!("Failed records:");
        println!("{}", format_table(&failures));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use semdrift_analysis::read_json;
    use semdrift_core::HashEmbeddingProvider;
    use uuid::Uuid;

    use crate::config::CliOverrides;
    use crate::error_message;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("semdrift_test_{}_{}", label, Uuid::now_v7()))
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        let path = |p: &str| dir.join(p).display().to_string();
        PipelineConfig {
            cache_dir: path("cache"),
            embedding_model: "hash/sha256-16".to_string(),
            output: path("docs/results.json"),
            chart: path("screenshots/chart.svg"),
            markdown: path("docs/data.md"),
            ..PipelineConfig::default()
        }
    }

    fn plain() -> RunCmd {
        RunCmd {
            input: None,
            output: None,
            chart: None,
            markdown: None,
            clear_cache: false,
            no_cache: false,
            collect_errors: false,
        }
    }

    #[test]
    fn builtin_fixture_writes_every_output() {
        let dir = temp_dir("run_fixture");
        let config = config_in(&dir);
        run(&plain(), &config).unwrap();

        let results = read_json(&config.output_path()).unwrap();
        let levels: Vec<i64> = results.iter().map(|r| r.corruption_level).collect();
        assert_eq!(levels, vec![0, 10, 20, 30, 40, 50]);
        assert!(config.chart_path().exists());
        let md = fs::read_to_string(config.markdown_path()).unwrap();
        assert!(md.contains("`hash/sha256-16`"));

        // Six originals and four distinct finals.
        let store = EmbeddingStore::open(config.cache_path()).unwrap();
        assert_eq!(store.stats().unwrap().entries, 10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn output_paths_follow_precedence() {
        let dir = temp_dir("run_paths");
        let mut config = config_in(&dir);
        let env_output = dir.join("env").join("results.json");
        let env_chart = dir.join("env").join("chart.svg");
        let cli_output = dir.join("cli").join("results.json");

        config
            .apply_env(|key: &str| match key {
                "SEMDRIFT_OUTPUT" => Some(env_output.display().to_string()),
                "SEMDRIFT_CHART" => Some(env_chart.display().to_string()),
                _ => None,
            })
            .unwrap();
        config.apply_overrides(&CliOverrides {
            output: Some(cli_output.display().to_string()),
            ..Default::default()
        });
        run(&plain(), &config).unwrap();

        assert!(cli_output.exists());
        assert!(!env_output.exists());
        assert!(env_chart.exists());
        assert!(dir.join("docs").join("data.md").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn clear_cache_runs_against_an_empty_cache() {
        let dir = temp_dir("run_clear");
        let config = config_in(&dir);
        let store = EmbeddingStore::open(config.cache_path()).unwrap();
        store
            .resolve(&HashEmbeddingProvider::new(16), "left over from an earlier run")
            .unwrap();
        let first = default_experiments().remove(0).original_text;
        fs::write(store.entry_path(&first), "{ not json").unwrap();

        let err = run(&plain(), &config).unwrap_err();
        assert!(
            error_message(err.as_ref()).starts_with("error: cache: "),
            "{}",
            error_message(err.as_ref())
        );

        let cmd = RunCmd {
            clear_cache: true,
            ..plain()
        };
        run(&cmd, &config).unwrap();
        assert!(store.lookup("left over from an earlier run").unwrap().is_none());
        assert_eq!(store.stats().unwrap().entries, 10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn disabled_cache_writes_nothing() {
        let dir = temp_dir("run_nocache");
        let config = PipelineConfig {
            enable_cache: false,
            ..config_in(&dir)
        };
        run(&plain(), &config).unwrap();
        assert!(!config.cache_path().exists());
        assert!(config.output_path().exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_record_fails_before_any_output() {
        let dir = temp_dir("run_invalid");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("experiments.json");
        fs::write(
            &input,
            r#"{"experiments": [
                {"error_percentage": 0, "original_english": "a", "final_english": "b"},
                {"error_percentage": 150, "original_english": "c", "final_english": "d"}
            ]}"#,
        )
        .unwrap();
        let config = config_in(&dir);
        let cmd = RunCmd {
            input: Some(input.display().to_string()),
            ..plain()
        };

        let err = run(&cmd, &config).unwrap_err();
        match err.downcast_ref::<DriftError>() {
            Some(DriftError::Validation { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        let message = error_message(err.as_ref());
        assert!(message.starts_with("error: validation: "), "{}", message);
        assert!(message.contains("record 1"));
        assert!(!config.output_path().exists());
        let store = EmbeddingStore::open(config.cache_path()).unwrap();
        assert_eq!(store.stats().unwrap().entries, 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn collected_failures_write_partial_outputs_then_fail() {
        let dir = temp_dir("run_collect");
        let config = config_in(&dir);
        let store = EmbeddingStore::open(config.cache_path()).unwrap();
        for record in default_experiments().iter().skip(1) {
            fs::write(store.entry_path(&record.original_text), "corrupt").unwrap();
        }

        let cmd = RunCmd {
            collect_errors: true,
            ..plain()
        };
        let err = run(&cmd, &config).unwrap_err();
        assert_eq!(error_message(err.as_ref()), "error: 5 of 6 records failed");

        let results = read_json(&config.output_path()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].corruption_level, 0);
        assert!(config.chart_path().exists());
        let md = fs::read_to_string(config.markdown_path()).unwrap();
        assert!(md.contains("need at least two results"));

        let _ = fs::remove_dir_all(&dir);
    }
}
