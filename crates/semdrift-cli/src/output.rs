// crates/semdrift-cli/src/output.rs
//
// Output formatting utilities for the semdrift CLI.
// Supports table and JSON output modes.

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled};

use semdrift_analysis::{ConfidenceInterval, DistanceChange, LevelGroup, RecordFailure};
use semdrift_core::DistanceResult;

/// Longest text shown in a table cell before truncation.
pub const MAX_CELL_TEXT: usize = 50;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Shorten `text` to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{}...", kept)
}

/// One measured record.
#[derive(Tabled)]
pub struct ResultRow {
    #[tabled(rename = "Error %")]
    pub level: i64,
    #[tabled(rename = "Distance")]
    pub distance: String,
    #[tabled(rename = "Similarity")]
    pub similarity: String,
    #[tabled(rename = "Original")]
    pub original: String,
    #[tabled(rename = "Final")]
    pub final_text: String,
}

impl From<&DistanceResult> for ResultRow {
    fn from(r: &DistanceResult) -> Self {
        Self {
            level: r.corruption_level,
            distance: format!("{:.6}", r.cosine_distance),
            similarity: format!("{:.6}", r.cosine_similarity),
            original: truncate(&r.record.original_text, MAX_CELL_TEXT),
            final_text: truncate(&r.record.final_text, MAX_CELL_TEXT),
        }
    }
}

/// A record that failed under the collect policy.
#[derive(Tabled)]
pub struct FailureRow {
    #[tabled(rename = "Record")]
    pub index: usize,
    #[tabled(rename = "Error %")]
    pub level: i64,
    #[tabled(rename = "Stage")]
    pub stage: &'static str,
    #[tabled(rename = "Error")]
    pub message: String,
}

impl From<&RecordFailure> for FailureRow {
    fn from(f: &RecordFailure) -> Self {
        Self {
            index: f.index,
            level: f.corruption_level,
            stage: f.error.stage(),
            message: f.error.to_string(),
        }
    }
}

/// Per-level distance statistics.
#[derive(Tabled)]
pub struct GroupRow {
    #[tabled(rename = "Error %")]
    pub level: i64,
    #[tabled(rename = "Count")]
    pub count: usize,
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "Std Dev")]
    pub stdev: String,
}

impl From<&LevelGroup> for GroupRow {
    fn from(g: &LevelGroup) -> Self {
        Self {
            level: g.level,
            count: g.count,
            mean: format!("{:.6}", g.mean),
            min: format!("{:.6}", g.min),
            max: format!("{:.6}", g.max),
            stdev: g
                .stdev
                .map(|s| format!("{:.6}", s))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Change between consecutive records.
#[derive(Tabled)]
pub struct ChangeRow {
    #[tabled(rename = "From %")]
    pub from_level: i64,
    #[tabled(rename = "To %")]
    pub to_level: i64,
    #[tabled(rename = "Delta")]
    pub delta: String,
    #[tabled(rename = "Change %")]
    pub pct: String,
}

impl From<&DistanceChange> for ChangeRow {
    fn from(c: &DistanceChange) -> Self {
        Self {
            from_level: c.from_level,
            to_level: c.to_level,
            delta: format!("{:+.6}", c.delta),
            pct: c
                .pct_change
                .map(|p| format!("{:+.2}", p))
                .unwrap_or_else(|| "n/a".to_string()),
        }
    }
}

/// Confidence interval for the mean distance at one level.
#[derive(Tabled)]
pub struct IntervalRow {
    #[tabled(rename = "Error %")]
    pub level: i64,
    #[tabled(rename = "Count")]
    pub count: usize,
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[tabled(rename = "Interval")]
    pub interval: String,
    #[tabled(rename = "Margin")]
    pub margin: String,
}

impl From<&ConfidenceInterval> for IntervalRow {
    fn from(ci: &ConfidenceInterval) -> Self {
        let dash = || "-".to_string();
        Self {
            level: ci.level,
            count: ci.count,
            mean: format!("{:.6}", ci.mean),
            interval: ci
                .lower
                .zip(ci.upper)
                .map(|(lo, hi)| format!("{:.0}%: [{:.6}, {:.6}]", ci.confidence * 100.0, lo, hi))
                .unwrap_or_else(dash),
            margin: ci.margin.map(|m| format!("±{:.6}", m)).unwrap_or_else(dash),
        }
    }
}

/// Two-column statistic/value row.
#[derive(Tabled)]
pub struct StatRow {
    #[tabled(rename = "Statistic")]
    pub name: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl StatRow {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}
