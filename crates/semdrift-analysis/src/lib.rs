// crates/semdrift-analysis/src/lib.rs
//
// semdrift-analysis: Distance measurement, experiment execution, statistics,
// and reporting for semdrift.
//
// This crate turns experiment records into per-record cosine distances
// (resolving embeddings through the cache), aggregates the distances into
// summary statistics and a regression on corruption level, and renders the
// results as a JSON report, a Markdown document, and a two-panel SVG chart.

pub mod chart;
pub mod distance;
pub mod report;
pub mod runner;
pub mod statistics;

// Re-export key types for ergonomic access from downstream crates.
pub use chart::to_chart;
pub use distance::{cosine_similarity, distance, Distance};
pub use report::{
    format_p_value, read_json, to_markdown, to_structured, write_json, ReportRow, StructuredReport,
};
pub use runner::{ErrorPolicy, ExperimentRunner, RecordFailure, RunOutcome};
pub use statistics::{
    by_level, confidence_intervals, correlation, describe, distance_changes, distribution,
    regress, summarize, ConfidenceInterval, Correlation, CorrelationStrength, Descriptive,
    DistanceChange, FitQuality, LevelGroup, LinearityConclusion, LinearityTest, Regression,
    SummaryStatistics,
};
