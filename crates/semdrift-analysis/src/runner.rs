// crates/semdrift-analysis/src/runner.rs
//
// Experiment runner: validates a batch of records, resolves the embeddings
// of both texts of every record, and measures the distance between them.

use semdrift_core::{DistanceResult, DriftError, EmbeddingProvider, ExperimentRecord};
use semdrift_store::EmbeddingStore;

use crate::distance::{distance, Distance};

/// What to do when a record fails after validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the batch on the first failure; no results are returned.
    #[default]
    Stop,
    /// Record the failure and continue with the next record.
    Collect,
}

/// A record that could not be measured under `ErrorPolicy::Collect`.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record in the input batch.
    pub index: usize,
    pub corruption_level: i64,
    pub error: DriftError,
}

/// Result of one run. `failures` is always empty under `ErrorPolicy::Stop`.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// One result per successful record, in input order.
    pub results: Vec<DistanceResult>,
    pub failures: Vec<RecordFailure>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Measures semantic distance for batches of experiment records.
///
/// The provider is passed in explicitly; when a store is attached every
/// embedding goes through it, otherwise the provider is called directly.
pub struct ExperimentRunner<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: Option<&'a EmbeddingStore>,
    policy: ErrorPolicy,
}

impl<'a> ExperimentRunner<'a> {
    /// Runner that resolves embeddings through `store`.
    pub fn new(provider: &'a dyn EmbeddingProvider, store: &'a EmbeddingStore) -> Self {
        Self {
            provider,
            store: Some(store),
            policy: ErrorPolicy::default(),
        }
    }

    /// Runner that bypasses the cache entirely.
    pub fn uncached(provider: &'a dyn EmbeddingProvider) -> Self {
        Self {
            provider,
            store: None,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Run every record in order.
    ///
    /// All records are validated before any embedding work; a validation
    /// failure aborts the batch regardless of policy.
    pub fn run(&self, records: &[ExperimentRecord]) -> Result<RunOutcome, DriftError> {
        for (index, record) in records.iter().enumerate() {
            record.validate(index)?;
        }

        tracing::info!(
            "Measuring {} records with {} (cache {})",
            records.len(),
            self.provider.model_id(),
            if self.store.is_some() { "enabled" } else { "disabled" }
        );

        let mut outcome = RunOutcome::default();
        for (index, record) in records.iter().enumerate() {
            match self.measure_record(record) {
                Ok(result) => {
                    tracing::info!(
                        "Record {}: level={}% distance={:.6} similarity={:.6}",
                        index,
                        result.corruption_level,
                        result.cosine_distance,
                        result.cosine_similarity
                    );
                    outcome.results.push(result);
                }
                Err(error) => {
                    tracing::error!(
                        "Record {} (level {}%) failed at {}: {}",
                        index,
                        record.corruption_level,
                        error.stage(),
                        error
                    );
                    match self.policy {
                        ErrorPolicy::Stop => return Err(error),
                        ErrorPolicy::Collect => outcome.failures.push(RecordFailure {
                            index,
                            corruption_level: record.corruption_level,
                            error,
                        }),
                    }
                }
            }
        }

        if !outcome.failures.is_empty() {
            tracing::warn!(
                "{} of {} records failed",
                outcome.failures.len(),
                records.len()
            );
        }
        Ok(outcome)
    }

    /// Distance between a single pair of texts.
    pub fn measure(&self, original: &str, final_text: &str) -> Result<Distance, DriftError> {
        ExperimentRecord::new(0, original, final_text).validate(0)?;
        let v1 = self.embed(original)?;
        let v2 = self.embed(final_text)?;
        distance(&v1, &v2)
    }

    fn measure_record(&self, record: &ExperimentRecord) -> Result<DistanceResult, DriftError> {
        let v1 = self.embed(&record.original_text)?;
        let v2 = self.embed(&record.final_text)?;
        let d = distance(&v1, &v2)?;
        Ok(DistanceResult {
            corruption_level: record.corruption_level,
            cosine_distance: d.cosine_distance,
            cosine_similarity: d.cosine_similarity,
            record: record.clone(),
        })
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DriftError> {
        match self.store {
            Some(store) => store.resolve(self.provider, text),
            None => self.provider.embed(text),
        }
    }
}
