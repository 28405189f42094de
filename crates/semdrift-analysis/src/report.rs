// crates/semdrift-analysis/src/report.rs
//
// Structured (JSON) and Markdown rendering of a run's results.
//
// Distances and similarities are rounded to six decimals when a report is
// built, and the summary block is computed from the rounded rows and stored
// unrounded. Parsing a report back and summarizing its rows therefore
// reproduces the summary block exactly.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use semdrift_core::{DistanceResult, DriftError, ExperimentRecord};
use serde::{Deserialize, Serialize};

use crate::statistics::{
    by_level, confidence_intervals, correlation, round_to, summarize, SummaryStatistics,
    DEFAULT_CONFIDENCE,
};

/// Decimal places kept for every float in a rendered report.
pub const REPORT_DECIMALS: i32 = 6;

/// One record of a structured report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    #[serde(flatten)]
    pub record: ExperimentRecord,
    pub cosine_distance: f64,
    pub cosine_similarity: f64,
}

impl ReportRow {
    pub fn into_result(self) -> DistanceResult {
        DistanceResult {
            corruption_level: self.record.corruption_level,
            cosine_distance: self.cosine_distance,
            cosine_similarity: self.cosine_similarity,
            record: self.record,
        }
    }
}

/// Machine-readable report of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredReport {
    pub generated_at: DateTime<Utc>,
    pub model_id: String,
    pub results: Vec<ReportRow>,
    /// Absent when the run has fewer than two results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryStatistics>,
}

impl StructuredReport {
    /// Rows converted back into distance results.
    pub fn distance_results(&self) -> Vec<DistanceResult> {
        self.results.iter().cloned().map(ReportRow::into_result).collect()
    }
}

/// Build the structured report for a run.
///
/// Runs too small to summarize still produce a report, without a summary.
pub fn to_structured(
    results: &[DistanceResult],
    model_id: &str,
) -> Result<StructuredReport, DriftError> {
    let rows: Vec<ReportRow> = results
        .iter()
        .map(|r| ReportRow {
            record: r.record.clone(),
            cosine_distance: round_to(r.cosine_distance, REPORT_DECIMALS),
            cosine_similarity: round_to(r.cosine_similarity, REPORT_DECIMALS),
        })
        .collect();

    let rounded: Vec<DistanceResult> = rows.iter().cloned().map(ReportRow::into_result).collect();
    let summary = match summarize(&rounded) {
        Ok(summary) => Some(summary),
        Err(e @ (DriftError::InsufficientData(_) | DriftError::UndefinedStatistic(_))) => {
            tracing::warn!("Writing report without summary: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(StructuredReport {
        generated_at: Utc::now(),
        model_id: model_id.to_string(),
        results: rows,
        summary,
    })
}

/// Write a report as pretty-printed JSON, creating parent directories.
pub fn write_json(report: &StructuredReport, path: &Path) -> Result<(), DriftError> {
    let json = serde_json::to_string_pretty(report)?;
    ensure_parent(path)?;
    fs::write(path, json).map_err(|e| {
        DriftError::Render(format!("Failed to write report {}: {}", path.display(), e))
    })?;
    tracing::info!("Wrote results to {}", path.display());
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsFile {
    Wrapped { results: Vec<ReportRow> },
    Bare(Vec<ReportRow>),
}

/// Parse report rows from JSON: a full report or a bare array of rows.
pub fn parse_results(json: &str) -> Result<Vec<DistanceResult>, DriftError> {
    let file: ResultsFile = serde_json::from_str(json).map_err(|e| {
        DriftError::Serialization(format!(
            "Results must be a report object or a list of result rows: {}",
            e
        ))
    })?;
    let rows = match file {
        ResultsFile::Wrapped { results } => results,
        ResultsFile::Bare(results) => results,
    };

    for (index, row) in rows.iter().enumerate() {
        row.record.validate(index)?;
    }
    Ok(rows.into_iter().map(ReportRow::into_result).collect())
}

/// Read report rows back from a file written by `write_json` (or a bare
/// array of rows).
pub fn read_json(path: &Path) -> Result<Vec<DistanceResult>, DriftError> {
    let json = fs::read_to_string(path).map_err(|e| {
        DriftError::Serialization(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_results(&json)
}

/// Render the experiment data document.
pub fn to_markdown(report: &StructuredReport) -> String {
    let results = report.distance_results();
    let mut md = vec![
        "# Semantic Drift Experiment Data".to_string(),
        String::new(),
        format!("- Generated: {}", report.generated_at.to_rfc3339()),
        format!("- Embedding model: `{}`", report.model_id),
        format!("- Records: {}", report.results.len()),
        String::new(),
        "## Results".to_string(),
        String::new(),
        "| Error Rate (%) | Cosine Distance | Cosine Similarity | Original | Final |".to_string(),
        "|---:|---:|---:|---|---|".to_string(),
    ];
    md.extend(report.results.iter().map(|row| {
        format!(
            "| {} | {:.6} | {:.6} | {} | {} |",
            row.record.corruption_level,
            row.cosine_distance,
            row.cosine_similarity,
            escape_cell(&row.record.original_text),
            escape_cell(&row.record.final_text)
        )
    }));

    md.push(String::new());
    md.push("## Summary Statistics".to_string());
    md.push(String::new());
    let Some(s) = &report.summary else {
        md.push("Summary statistics need at least two results.".to_string());
        md.push(String::new());
        return md.join("\n");
    };
    md.push("| Statistic | Cosine Distance |".to_string());
    md.push("|---|---:|".to_string());
    for (name, value) in [
        ("Mean", s.mean),
        ("Std Dev", s.stdev),
        ("Median", s.median),
        ("Q1", s.q1),
        ("Q3", s.q3),
        ("IQR", s.iqr),
    ] {
        md.push(format!("| {} | {:.6} |", name, value));
    }
    md.push(format!("| Min | {:.6} (at {}%) |", s.min, s.min_level));
    md.push(format!("| Max | {:.6} (at {}%) |", s.max, s.max_level));

    if let Some(reg) = &s.regression {
        let linearity = reg.linearity();
        md.extend([
            String::new(),
            "## Regression".to_string(),
            String::new(),
            format!(
                "distance = {:.6} x error_rate + {:.6}",
                reg.slope, reg.intercept
            ),
            String::new(),
            format!("- R²: {:.6} ({})", reg.r_squared, reg.fit_quality()),
            format!("- RMSE: {:.6}", reg.rmse),
            format!("- MAE: {:.6}", reg.mae),
            format!("- Slope std. error: {:.6}", reg.std_err),
            format!("- Slope p-value: {}", format_p_value(reg.p_value)),
            format!("- Linearity: {}", linearity.conclusion),
        ]);
    }

    if let Ok(corr) = correlation(&results) {
        md.extend([
            String::new(),
            "## Correlation".to_string(),
            String::new(),
            format!(
                "- Pearson r: {:.6} ({}), p = {}",
                corr.pearson,
                corr.strength,
                format_p_value(corr.pearson_p_value)
            ),
            format!(
                "- Spearman ρ: {:.6}, p = {}",
                corr.spearman,
                format_p_value(corr.spearman_p_value)
            ),
        ]);
    }

    let groups = by_level(&results);
    if groups.iter().any(|g| g.count > 1) {
        let intervals = confidence_intervals(&results, DEFAULT_CONFIDENCE).unwrap_or_default();
        md.extend([
            String::new(),
            "## By Error Rate".to_string(),
            String::new(),
            format!(
                "| Error Rate (%) | Count | Mean | Min | Max | Std Dev | {:.0}% CI |",
                DEFAULT_CONFIDENCE * 100.0
            ),
            "|---:|---:|---:|---:|---:|---:|---|".to_string(),
        ]);
        for g in &groups {
            let stdev = g
                .stdev
                .map(|v| format!("{:.6}", v))
                .unwrap_or_else(|| "-".to_string());
            let interval = intervals
                .iter()
                .find(|ci| ci.level == g.level)
                .and_then(|ci| ci.lower.zip(ci.upper))
                .map(|(lo, hi)| format!("[{:.6}, {:.6}]", lo, hi))
                .unwrap_or_else(|| "-".to_string());
            md.push(format!(
                "| {} | {} | {:.6} | {:.6} | {:.6} | {} | {} |",
                g.level, g.count, g.mean, g.min, g.max, stdev, interval
            ));
        }
    }

    md.push(String::new());
    md.join("\n")
}

/// Render a p-value for display; `n/a` when the test was not possible.
pub fn format_p_value(p_value: Option<f64>) -> String {
    match p_value {
        Some(p) if p < 1e-4 => format!("{:.3e}", p),
        Some(p) => format!("{:.4}", p),
        None => "n/a".to_string(),
    }
}

/// Write the Markdown document, creating parent directories.
pub fn write_markdown(report: &StructuredReport, path: &Path) -> Result<(), DriftError> {
    ensure_parent(path)?;
    fs::write(path, to_markdown(report)).map_err(|e| {
        DriftError::Render(format!("Failed to write {}: {}", path.display(), e))
    })?;
    tracing::info!("Wrote experiment data document to {}", path.display());
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), DriftError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            DriftError::Render(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
