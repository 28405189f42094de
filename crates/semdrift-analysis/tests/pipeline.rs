// crates/semdrift-analysis/tests/pipeline.rs
//
// End-to-end tests for the measurement pipeline.
//
// Exercises the cache, runner, statistics, and report layers together with a
// scripted provider that counts model invocations and returns vectors whose
// pairwise cosine distances are known in advance.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use semdrift_analysis::report::{read_json, to_markdown, to_structured, write_json, StructuredReport};
use semdrift_analysis::statistics::{summarize, FitQuality};
use semdrift_analysis::{to_chart, ErrorPolicy, ExperimentRunner};
use semdrift_core::{
    DriftError, EmbeddingModelId, EmbeddingProvider, ExperimentRecord, HashEmbeddingProvider,
};
use semdrift_store::EmbeddingStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FIXTURE_DISTANCES: [f64; 6] = [
    0.098352, 0.255704, 0.334175, 0.349889, 0.483970, 0.555445,
];

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("semdrift_test_{}_{}", label, Uuid::now_v7()))
}

/// Provider with a fixed text -> vector table that counts every call.
struct ScriptedProvider {
    model_id: EmbeddingModelId,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn model_id(&self) -> &EmbeddingModelId {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DriftError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| DriftError::EmbeddingFailure(format!("no vector for {:?}", text)))
    }
}

/// Records at levels 0..=50 whose final texts sit at the fixture distances
/// from a shared original text.
fn monotonic_fixture() -> (ScriptedProvider, Vec<ExperimentRecord>) {
    let original = "the original sentence";
    let mut vectors = HashMap::new();
    vectors.insert(original.to_string(), vec![1.0f32, 0.0]);

    let mut records = Vec::new();
    for (i, d) in FIXTURE_DISTANCES.iter().enumerate() {
        let level = i as i64 * 10;
        let final_text = format!("final text at {}%", level);
        let cos = 1.0 - d;
        let sin = (1.0 - cos * cos).sqrt();
        vectors.insert(final_text.clone(), vec![cos as f32, sin as f32]);
        records.push(ExperimentRecord::new(level, original, final_text));
    }

    let provider = ScriptedProvider {
        model_id: EmbeddingModelId::new("scripted", "unit"),
        vectors,
        calls: AtomicUsize::new(0),
    };
    (provider, records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn monotonic_fixture_summary() {
    let (provider, records) = monotonic_fixture();
    let dir = temp_dir("monotonic");
    let store = EmbeddingStore::open(&dir).unwrap();

    let outcome = ExperimentRunner::new(&provider, &store).run(&records).unwrap();
    assert!(outcome.is_complete());
    for (result, expected) in outcome.results.iter().zip(FIXTURE_DISTANCES) {
        assert!(
            (result.cosine_distance - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            result.cosine_distance
        );
    }

    let stats = summarize(&outcome.results).unwrap();
    assert!((stats.min - 0.098352).abs() < 1e-6);
    assert!((stats.max - 0.555445).abs() < 1e-6);
    assert_eq!(stats.min_level, 0);
    assert_eq!(stats.max_level, 50);
    let reg = stats.regression.unwrap();
    assert!(reg.r_squared > 0.9);
    assert!(reg.slope > 0.0);
    assert_eq!(reg.fit_quality(), FitQuality::Excellent);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn shared_original_is_embedded_once() {
    let (provider, records) = monotonic_fixture();
    let dir = temp_dir("shared");
    let store = EmbeddingStore::open(&dir).unwrap();

    ExperimentRunner::new(&provider, &store).run(&records).unwrap();
    // One original plus six distinct finals.
    assert_eq!(provider.calls(), 7);
    assert_eq!(store.stats().unwrap().entries, 7);

    // A second run is served entirely from the cache.
    ExperimentRunner::new(&provider, &store).run(&records).unwrap();
    assert_eq!(provider.calls(), 7);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cache_bypass_calls_model_every_time() {
    let (provider, records) = monotonic_fixture();
    ExperimentRunner::uncached(&provider).run(&records).unwrap();
    assert_eq!(provider.calls(), 12);
}

#[test]
fn cached_vectors_are_bit_identical() {
    let provider = HashEmbeddingProvider::new(64);
    let dir = temp_dir("bits");
    let store = EmbeddingStore::open(&dir).unwrap();

    let computed = store.resolve(&provider, "drift happens").unwrap();
    let reopened = EmbeddingStore::open(&dir).unwrap();
    let cached = reopened.resolve(&provider, "drift happens").unwrap();
    let a: Vec<u32> = computed.iter().map(|v| v.to_bits()).collect();
    let b: Vec<u32> = cached.iter().map(|v| v.to_bits()).collect();
    assert_eq!(a, b);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn clear_then_resolve_recomputes_once() {
    let (provider, _) = monotonic_fixture();
    let dir = temp_dir("clear");
    let store = EmbeddingStore::open(&dir).unwrap();

    store.resolve(&provider, "the original sentence").unwrap();
    assert_eq!(provider.calls(), 1);
    assert_eq!(store.clear().unwrap(), 1);

    store.resolve(&provider, "the original sentence").unwrap();
    store.resolve(&provider, "the original sentence").unwrap();
    assert_eq!(provider.calls(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_original_fails_fast() {
    let (provider, mut records) = monotonic_fixture();
    records[3].original_text.clear();
    let dir = temp_dir("failfast");
    let store = EmbeddingStore::open(&dir).unwrap();

    let err = ExperimentRunner::new(&provider, &store)
        .run(&records)
        .unwrap_err();
    match err {
        DriftError::Validation { index, .. } => assert_eq!(index, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.calls(), 0);
    assert_eq!(store.stats().unwrap().entries, 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn collect_policy_reports_unknown_text() {
    let (provider, mut records) = monotonic_fixture();
    records[2].final_text = "never scripted".to_string();

    let outcome = ExperimentRunner::uncached(&provider)
        .with_policy(ErrorPolicy::Collect)
        .run(&records)
        .unwrap();
    assert_eq!(outcome.results.len(), 5);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 2);
    assert_eq!(outcome.failures[0].error.stage(), "embedding");
}

#[test]
fn report_round_trip_reproduces_summary() {
    let (provider, records) = monotonic_fixture();
    let outcome = ExperimentRunner::uncached(&provider).run(&records).unwrap();

    let dir = temp_dir("report");
    let path = dir.join("results").join("experiment_results.json");
    let report = to_structured(&outcome.results, "scripted/unit").unwrap();
    write_json(&report, &path).unwrap();

    let parsed = read_json(&path).unwrap();
    assert_eq!(parsed.len(), 6);
    assert_eq!(parsed[4].record, records[4]);

    assert_eq!(Some(summarize(&parsed).unwrap()), report.summary);

    let stored: StructuredReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored.summary, report.summary);

    // Rendering the parsed rows again yields the same rows and summary.
    let again = to_structured(&parsed, "scripted/unit").unwrap();
    assert_eq!(again.results, report.results);
    assert_eq!(again.summary, report.summary);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn chart_written_next_to_report() {
    let (provider, records) = monotonic_fixture();
    let outcome = ExperimentRunner::uncached(&provider).run(&records).unwrap();

    let dir = temp_dir("chart");
    let path = dir.join("graphs").join("error_vs_distance.svg");
    to_chart(&outcome.results, &path).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn collected_run_with_one_success_still_reports() {
    let (provider, mut records) = monotonic_fixture();
    for record in records.iter_mut().skip(1) {
        record.final_text = "never scripted".to_string();
    }

    let outcome = ExperimentRunner::uncached(&provider)
        .with_policy(ErrorPolicy::Collect)
        .run(&records)
        .unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failures.len(), 5);

    let dir = temp_dir("partial");
    let report = to_structured(&outcome.results, "scripted/unit").unwrap();
    assert!(report.summary.is_none());
    write_json(&report, &dir.join("results.json")).unwrap();
    to_chart(&outcome.results, &dir.join("chart.svg")).unwrap();
    assert!(to_markdown(&report).contains("| 0 | 0.098352 |"));

    let parsed = read_json(&dir.join("results.json")).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].corruption_level, 0);

    let _ = std::fs::remove_dir_all(&dir);
}
