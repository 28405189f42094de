// crates/semdrift-core/src/record.rs
//
// Experiment input records and per-record distance results.
//
// Records arrive from an external producer (the translation chain) as JSON:
//
//   {"experiments": [{"error_percentage": 10,
//                     "original_english": "...",
//                     "final_english": "..."}, ...]}
//
// A bare array of the same objects is accepted too.

use serde::{Deserialize, Serialize};

use crate::error::DriftError;

/// Highest accepted corruption level (percent).
pub const MAX_CORRUPTION_LEVEL: i64 = 100;

/// One `(corruption_level, original_text, final_text)` observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    /// Percentage of corrupted words in the original text.
    #[serde(rename = "error_percentage")]
    pub corruption_level: i64,
    /// Text fed into the transformation chain.
    #[serde(rename = "original_english")]
    pub original_text: String,
    /// Text that came out of the last transformation.
    #[serde(rename = "final_english")]
    pub final_text: String,
}

impl ExperimentRecord {
    pub fn new(
        corruption_level: i64,
        original_text: impl Into<String>,
        final_text: impl Into<String>,
    ) -> Self {
        Self {
            corruption_level,
            original_text: original_text.into(),
            final_text: final_text.into(),
        }
    }

    /// Cheap structural checks, run before any embedding work.
    ///
    /// `index` is the record's position in its batch and is carried into the
    /// error so the caller can point at the offending record.
    pub fn validate(&self, index: usize) -> Result<(), DriftError> {
        if !(0..=MAX_CORRUPTION_LEVEL).contains(&self.corruption_level) {
            return Err(DriftError::Validation {
                index,
                reason: format!(
                    "corruption level {} outside 0..={}",
                    self.corruption_level, MAX_CORRUPTION_LEVEL
                ),
            });
        }
        if self.original_text.is_empty() {
            return Err(DriftError::Validation {
                index,
                reason: "original_text is empty".to_string(),
            });
        }
        if self.final_text.is_empty() {
            return Err(DriftError::Validation {
                index,
                reason: "final_text is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Distance between the embeddings of one record's original and final text.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResult {
    pub corruption_level: i64,
    /// `1 - cosine_similarity`, in `[0, 2]`.
    pub cosine_distance: f64,
    /// In `[-1, 1]`.
    pub cosine_similarity: f64,
    /// The record this result was computed from.
    pub record: ExperimentRecord,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExperimentsFile {
    Wrapped { experiments: Vec<ExperimentRecord> },
    Bare(Vec<ExperimentRecord>),
}

/// Parse an experiments document (wrapped `{"experiments": [...]}` or a bare
/// array). Records are not validated here; the runner does that.
pub fn parse_experiments(json: &str) -> Result<Vec<ExperimentRecord>, DriftError> {
    let file: ExperimentsFile = serde_json::from_str(json).map_err(|e| {
        DriftError::Serialization(format!(
            "Input must be an experiments list or an object with an 'experiments' list: {}",
            e
        ))
    })?;
    Ok(match file {
        ExperimentsFile::Wrapped { experiments } => experiments,
        ExperimentsFile::Bare(experiments) => experiments,
    })
}

const FINAL_BASE: &str = "The advanced artificial intelligence system successfully translates complex linguistic models into multiple languages with exceptional accuracy and precision.";

/// Built-in fixture used when no input file is given: one sentence at six
/// spelling-corruption levels (0-50%) and the English that came back from
/// the translation chain.
pub fn default_experiments() -> Vec<ExperimentRecord> {
    vec![
        ExperimentRecord::new(
            0,
            "The advanced artificial intelligence system successfully translates complex linguistic patterns across multiple languages with remarkable accuracy and precision.",
            FINAL_BASE,
        ),
        ExperimentRecord::new(
            10,
            "The advansed artificial inteligence system sucessfully translates complex linguistic patterns across multiple languages with remarkable accuracy and precision.",
            FINAL_BASE,
        ),
        ExperimentRecord::new(
            20,
            "The advansed artificial inteligence sistem sucessfully translates complex lingustic patterns across multiple languages with remarkable accuracy and precision.",
            FINAL_BASE,
        ),
        ExperimentRecord::new(
            30,
            "The advansed artificial inteligence sistem sucessfully translates complex lingustic patterns across multiple langages with remarkble accuracy and precision.",
            "The advanced artificial intelligence system successfully translates complex linguistic models in multiple languages with exceptional accuracy and precision.",
        ),
        ExperimentRecord::new(
            40,
            "The advansed articial inteligence sistem sucessfully transltes complex lingustic patterns acros multiple langages with remarkble accuracy and presicion.",
            "The advanced artificial intelligence system successfully translates complex linguistic models across multiple languages with exceptional accuracy and reliability.",
        ),
        ExperimentRecord::new(
            50,
            "The advansed articial inteligence sistem sucsessfully transltes complx lingustic patters acros multple langages with remarkble acuracy and presicion.",
            "The advanced artificial intelligence system successfully translates complex linguistic models between multiple languages with exceptional accuracy and reliability.",
        ),
    ]
}
