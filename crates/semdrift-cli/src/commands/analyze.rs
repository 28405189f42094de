// crates/semdrift-cli/src/commands/analyze.rs
//
// `semdrift analyze` — re-ingest a results report and print its statistics:
// summary, regression and linearity test, correlation, per-level groups with
// confidence intervals, consecutive changes, and the similarity distribution.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use semdrift_analysis::statistics::{
    by_level, confidence_intervals, correlation, distance_changes, distribution, summarize,
    ConfidenceInterval, Correlation, Descriptive, DistanceChange, LevelGroup, LinearityTest,
    SummaryStatistics, DEFAULT_CONFIDENCE,
};
use semdrift_analysis::{format_p_value, read_json};
use semdrift_core::DriftError;

use crate::output::{
    format_json, format_table, ChangeRow, GroupRow, IntervalRow, OutputFormat, StatRow,
};

/// Analyze a previously written results report.
#[derive(Debug, Args)]
pub struct AnalyzeCmd {
    /// Results report (or bare list of result rows) to analyze.
    #[arg(long, short = 'r')]
    pub results: PathBuf,

    /// Confidence level for the per-level intervals.
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    pub confidence: f64,

    /// Output format.
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct Analysis {
    summary: Option<SummaryStatistics>,
    linearity: Option<LinearityTest>,
    correlation: Option<Correlation>,
    by_level: Vec<LevelGroup>,
    confidence_intervals: Vec<ConfidenceInterval>,
    distance_changes: Vec<DistanceChange>,
    similarity_distribution: Descriptive,
}

/// Run the analyze command.
pub fn run(cmd: &AnalyzeCmd) -> Result<(), Box<dyn std::error::Error>> {
    let results = read_json(&cmd.results)?;
    tracing::info!("Loaded {} results from {}", results.len(), cmd.results.display());

    let summary = optional("summary", summarize(&results))?;
    let analysis = Analysis {
        linearity: summary
            .as_ref()
            .and_then(|s| s.regression.as_ref())
            .map(|reg| reg.linearity()),
        summary,
        correlation: optional("correlation", correlation(&results))?,
        by_level: by_level(&results),
        confidence_intervals: confidence_intervals(&results, cmd.confidence)?,
        distance_changes: distance_changes(&results),
        similarity_distribution: distribution(&results)?,
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", format_json(&analysis)),
        OutputFormat::Table => print_tables(&analysis),
    }
    Ok(())
}

/// Statistics that a small sample cannot support are skipped, not fatal.
fn optional<T>(what: &str, result: Result<T, DriftError>) -> Result<Option<T>, DriftError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ (DriftError::InsufficientData(_) | DriftError::UndefinedStatistic(_))) => {
            tracing::warn!("Skipping {}: {}", what, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_tables(a: &Analysis) {
    let mut rows = Vec::new();
    if let Some(s) = &a.summary {
        rows.extend(summary_rows(s));
    }
    if let Some(test) = &a.linearity {
        rows.push(StatRow::new("Linearity", test.conclusion.to_string()));
    }
    if let Some(c) = &a.correlation {
        rows.push(StatRow::new(
            "Pearson r",
            format!(
                "{:.6} ({}), p = {}",
                c.pearson,
                c.strength,
                format_p_value(c.pearson_p_value)
            ),
        ));
        rows.push(StatRow::new(
            "Spearman ρ",
            format!("{:.6}, p = {}", c.spearman, format_p_value(c.spearman_p_value)),
        ));
    }
    if rows.is_empty() {
        println!("Distance statistics need at least two results");
    } else {
        println!("Distance statistics");
        println!("{}", format_table(&rows));
    }
    print_similarity_and_groups(a);
}

fn summary_rows(s: &SummaryStatistics) -> Vec<StatRow> {
    let mut rows = vec![
        StatRow::new("Records", s.count.to_string()),
        StatRow::new("Mean distance", format!("{:.6}", s.mean)),
        StatRow::new("Std dev", format!("{:.6}", s.stdev)),
        StatRow::new("Median", format!("{:.6}", s.median)),
        StatRow::new("Q1", format!("{:.6}", s.q1)),
        StatRow::new("Q3", format!("{:.6}", s.q3)),
        StatRow::new("IQR", format!("{:.6}", s.iqr)),
        StatRow::new("Min", format!("{:.6} at {}%", s.min, s.min_level)),
        StatRow::new("Max", format!("{:.6} at {}%", s.max, s.max_level)),
    ];
    if let Some(reg) = &s.regression {
        rows.push(StatRow::new("Slope", format!("{:.6}", reg.slope)));
        rows.push(StatRow::new("Intercept", format!("{:.6}", reg.intercept)));
        rows.push(StatRow::new(
            "R²",
            format!("{:.6} ({})", reg.r_squared, reg.fit_quality()),
        ));
        rows.push(StatRow::new("RMSE", format!("{:.6}", reg.rmse)));
        rows.push(StatRow::new("MAE", format!("{:.6}", reg.mae)));
        rows.push(StatRow::new("Slope std. error", format!("{:.6}", reg.std_err)));
        rows.push(StatRow::new("Slope p-value", format_p_value(reg.p_value)));
    }
    rows
}

fn print_similarity_and_groups(a: &Analysis) {
    let d = &a.similarity_distribution;
    let sim_rows = vec![
        StatRow::new("Mean", format!("{:.6}", d.mean)),
        StatRow::new(
            "Std dev",
            d.stdev
                .map(|v| format!("{:.6}", v))
                .unwrap_or_else(|| "-".to_string()),
        ),
        StatRow::new("Min", format!("{:.6}", d.min)),
        StatRow::new("Max", format!("{:.6}", d.max)),
        StatRow::new("Median", format!("{:.6}", d.median)),
        StatRow::new("IQR", format!("{:.6}", d.iqr)),
    ];
    println!();
    println!("Similarity distribution");
    println!("{}", format_table(&sim_rows));

    let groups: Vec<GroupRow> = a.by_level.iter().map(GroupRow::from).collect();
    println!();
    println!("By error rate");
    println!("{}", format_table(&groups));

    if a.confidence_intervals.iter().any(|ci| ci.margin.is_some()) {
        let intervals: Vec<IntervalRow> =
            a.confidence_intervals.iter().map(IntervalRow::from).collect();
        println!();
        println!("Confidence intervals");
        println!("{}", format_table(&intervals));
    }

    if !a.distance_changes.is_empty() {
        let changes: Vec<ChangeRow> = a.distance_changes.iter().map(ChangeRow::from).collect();
        println!();
        println!("Distance changes");
        println!("{}", format_table(&changes));
    }
}
