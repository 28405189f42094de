// crates/semdrift-core/src/provider.rs
//
// Embedding provider implementations.
//
//   - `HashEmbeddingProvider`: deterministic SHA-256 pseudo-embeddings.
//     Offline, instant, and reproducible; distances are meaningful only as
//     "identical vs. different text", not as semantic similarity.
//   - `HttpEmbeddingProvider`: any OpenAI-compatible `POST /embeddings`
//     endpoint (api.openai.com, or a local server hosting a sentence
//     transformer such as all-MiniLM-L6-v2).
//
// `provider_from_model` picks one from a `provider/name` model id.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::{hash_embedding, EmbeddingModelId};
use crate::error::DriftError;
use crate::traits::EmbeddingProvider;

/// Default dimensionality of hash embeddings (matches all-MiniLM-L6-v2).
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const LOCAL_ENDPOINT: &str = "http://127.0.0.1:8080/v1";

/// Settings needed to construct a provider beyond its model id.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible API (`.../v1`).
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint.
    pub api_key: Option<String>,
    /// Output dimensionality, when it cannot be inferred from the model name.
    pub dimensions: Option<usize>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Deterministic, model-free embedding provider.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    model_id: EmbeddingModelId,
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            model_id: EmbeddingModelId::new("hash", format!("sha256-{}", dimensions)),
            dimensions,
        }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn model_id(&self) -> &EmbeddingModelId {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DriftError> {
        if text.is_empty() {
            return Err(DriftError::EmbeddingFailure(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(hash_embedding(text, self.dimensions))
    }
}

/// Request body for `POST /embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    /// Requested output size, for models that can shorten their vectors.
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Response body of `POST /embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Provider backed by an OpenAI-compatible embeddings endpoint.
///
/// The HTTP client is built on the first `embed` call and reused for the
/// provider's lifetime.
#[derive(Debug)]
pub struct HttpEmbeddingProvider {
    model_id: EmbeddingModelId,
    dimensions: usize,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    /// Sent as `dimensions` in every request when set.
    request_dimensions: Option<usize>,
    client: OnceLock<Client>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        model_id: EmbeddingModelId,
        dimensions: usize,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            model_id,
            dimensions,
            endpoint: endpoint.into(),
            api_key,
            timeout,
            request_dimensions: None,
            client: OnceLock::new(),
        }
    }

    /// Ask the endpoint to shorten its vectors to the provider's dimensions.
    pub fn with_requested_dimensions(mut self) -> Self {
        self.request_dimensions = Some(self.dimensions);
        self
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            input: text,
            model: &self.model_id.name,
            dimensions: self.request_dimensions,
        }
    }

    fn client(&self) -> Result<&Client, DriftError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        tracing::info!(
            "Initializing embedding client for {} at {}",
            self.model_id,
            self.endpoint
        );
        let built = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                DriftError::EmbeddingFailure(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(self.client.get_or_init(|| built))
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.endpoint.trim_end_matches('/'))
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn model_id(&self) -> &EmbeddingModelId {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DriftError> {
        if text.is_empty() {
            return Err(DriftError::EmbeddingFailure(
                "Cannot embed empty text".to_string(),
            ));
        }

        let client = self.client()?;
        let mut request = client.post(self.url()).json(&self.request(text));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().map_err(|e| {
            DriftError::EmbeddingFailure(format!("Request to {} failed: {}", self.url(), e))
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(DriftError::EmbeddingFailure(format!(
                "{} returned {}: {}",
                self.url(),
                status,
                body
            )));
        }

        let parsed: EmbeddingResponse = resp.json().map_err(|e| {
            DriftError::EmbeddingFailure(format!("Malformed embeddings response: {}", e))
        })?;
        first_embedding(parsed, self.dimensions)
    }
}

/// Extract the single embedding from a response and check its length.
fn first_embedding(resp: EmbeddingResponse, expected_dims: usize) -> Result<Vec<f32>, DriftError> {
    let vector = resp
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| DriftError::EmbeddingFailure("Empty embeddings response".to_string()))?;

    if vector.len() != expected_dims {
        return Err(DriftError::EmbeddingFailure(format!(
            "Model returned {} dimensions, expected {}",
            vector.len(),
            expected_dims
        )));
    }
    Ok(vector)
}

/// Models whose output can be shortened with the `dimensions` request field.
fn supports_shortening(name: &str) -> bool {
    name.starts_with("text-embedding-3-")
}

/// Known output sizes for common models.
fn known_dimensions(name: &str) -> Option<usize> {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" | "bge-small-en-v1.5" => Some(384),
        "all-mpnet-base-v2" | "bge-base-en-v1.5" | "nomic-embed-text-v1.5" => Some(768),
        _ => None,
    }
}

/// Build a provider from a `provider/name` model id.
///
/// | provider | backend                                  | key        |
/// |----------|------------------------------------------|------------|
/// | `hash`   | `HashEmbeddingProvider` (`sha256-<dims>`)| none       |
/// | `openai` | `HttpEmbeddingProvider`, api.openai.com  | required   |
/// | `local`  | `HttpEmbeddingProvider`, local endpoint  | optional   |
pub fn provider_from_model(
    model: &str,
    settings: &ProviderSettings,
) -> Result<Box<dyn EmbeddingProvider>, DriftError> {
    let model_id: EmbeddingModelId = model.parse()?;
    let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(30));

    match model_id.provider.as_str() {
        "hash" => {
            let dims = model_id
                .name
                .strip_prefix("sha256-")
                .and_then(|d| d.parse::<usize>().ok())
                .ok_or_else(|| {
                    DriftError::Config(format!(
                        "Hash model must be named sha256-<dims>, got {:?}",
                        model_id.name
                    ))
                })?;
            if dims == 0 {
                return Err(DriftError::Config("Hash dimensions must be > 0".to_string()));
            }
            Ok(Box::new(HashEmbeddingProvider::new(dims)))
        }
        "openai" | "local" => {
            let known = known_dimensions(&model_id.name);
            let dims = settings.dimensions.or(known).ok_or_else(|| {
                DriftError::Config(format!(
                    "Unknown output dimensions for {}; set embedding_dimensions",
                    model_id
                ))
            })?;
            let shorten = match known {
                Some(full) if full != dims => {
                    if !supports_shortening(&model_id.name) || dims > full {
                        return Err(DriftError::Config(format!(
                            "{} always returns {} dimensions; cannot use {}",
                            model_id, full, dims
                        )));
                    }
                    true
                }
                _ => false,
            };
            let is_openai = model_id.provider == "openai";
            let default_endpoint = if is_openai { OPENAI_ENDPOINT } else { LOCAL_ENDPOINT };
            let endpoint = settings
                .endpoint
                .clone()
                .unwrap_or_else(|| default_endpoint.to_string());
            if is_openai && settings.api_key.is_none() {
                return Err(DriftError::Config(
                    "OPENAI_API_KEY is required for openai/* models".to_string(),
                ));
            }
            let provider = HttpEmbeddingProvider::new(
                model_id,
                dims,
                endpoint,
                settings.api_key.clone(),
                timeout,
            );
            Ok(Box::new(if shorten {
                provider.with_requested_dimensions()
            } else {
                provider
            }))
        }
        other => Err(DriftError::Config(format!(
            "Unknown embedding provider {:?} (expected hash, openai, or local)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_provider_reports_model_and_dims() {
        let provider = HashEmbeddingProvider::new(16);
        assert_eq!(provider.model_id().to_string(), "hash/sha256-16");
        assert_eq!(provider.dimensions(), 16);
        assert_eq!(provider.embed("abc").unwrap().len(), 16);
    }

    #[test]
    fn hash_provider_rejects_empty_text() {
        let err = HashEmbeddingProvider::default().embed("").unwrap_err();
        assert!(matches!(err, DriftError::EmbeddingFailure(_)));
    }

    #[test]
    fn from_model_builds_hash_provider() {
        let provider = provider_from_model("hash/sha256-64", &ProviderSettings::default()).unwrap();
        assert_eq!(provider.dimensions(), 64);
        assert_eq!(provider.model_id().to_string(), "hash/sha256-64");
    }

    #[test]
    fn from_model_rejects_bad_hash_name() {
        assert!(provider_from_model("hash/md5", &ProviderSettings::default()).is_err());
        assert!(provider_from_model("hash/sha256-0", &ProviderSettings::default()).is_err());
    }

    #[test]
    fn from_model_requires_openai_key() {
        let err = provider_from_model("openai/text-embedding-3-small", &ProviderSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, DriftError::Config(_)));

        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = provider_from_model("openai/text-embedding-3-small", &settings).unwrap();
        assert_eq!(provider.dimensions(), 1536);
    }

    #[test]
    fn from_model_infers_local_dimensions() {
        let provider = provider_from_model(
            "local/sentence-transformers/all-MiniLM-L6-v2",
            &ProviderSettings::default(),
        )
        .unwrap();
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn from_model_needs_dimensions_for_unknown_model() {
        assert!(provider_from_model("local/my-model", &ProviderSettings::default()).is_err());
        let settings = ProviderSettings {
            dimensions: Some(12),
            ..Default::default()
        };
        assert_eq!(
            provider_from_model("local/my-model", &settings).unwrap().dimensions(),
            12
        );
    }

    #[test]
    fn from_model_rejects_unknown_provider() {
        assert!(provider_from_model("cohere/embed-v3", &ProviderSettings::default()).is_err());
    }

    #[test]
    fn from_model_dimension_override_for_fixed_models() {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            dimensions: Some(256),
            ..Default::default()
        };
        let provider = provider_from_model("openai/text-embedding-3-small", &settings).unwrap();
        assert_eq!(provider.dimensions(), 256);

        let err = provider_from_model("openai/text-embedding-ada-002", &settings)
            .err()
            .unwrap();
        assert!(matches!(err, DriftError::Config(_)));

        let local = ProviderSettings {
            dimensions: Some(512),
            ..Default::default()
        };
        assert!(provider_from_model("local/all-MiniLM-L6-v2", &local).is_err());

        // Matching the known size is not an override.
        let same = ProviderSettings {
            dimensions: Some(384),
            ..Default::default()
        };
        assert!(provider_from_model("local/all-MiniLM-L6-v2", &same).is_ok());
    }

    #[test]
    fn request_carries_dimensions_only_when_shortened() {
        let provider = HttpEmbeddingProvider::new(
            EmbeddingModelId::new("openai", "text-embedding-3-small"),
            256,
            OPENAI_ENDPOINT,
            None,
            Duration::from_secs(2),
        );
        let body = serde_json::to_value(provider.request("hi")).unwrap();
        assert_eq!(body["model"], "text-embedding-3-small");
        assert!(body.get("dimensions").is_none());

        let shortened = provider.with_requested_dimensions();
        let body = serde_json::to_value(shortened.request("hi")).unwrap();
        assert_eq!(body["input"], "hi");
        assert_eq!(body["dimensions"], 256);
    }

    #[test]
    fn first_embedding_checks_dimensions() {
        let resp = EmbeddingResponse {
            data: vec![EmbeddingDatum {
                embedding: vec![0.1, 0.2, 0.3],
            }],
        };
        assert_eq!(first_embedding(resp, 3).unwrap(), vec![0.1, 0.2, 0.3]);

        let resp = EmbeddingResponse {
            data: vec![EmbeddingDatum {
                embedding: vec![0.1, 0.2],
            }],
        };
        assert!(first_embedding(resp, 3).is_err());

        let empty = EmbeddingResponse { data: vec![] };
        assert!(first_embedding(empty, 3).is_err());
    }

    #[test]
    fn http_provider_parses_openai_payload() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.5]}],"model":"m"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_embedding(resp, 2).unwrap(), vec![0.5, -0.5]);
    }

    #[test]
    fn http_provider_unreachable_endpoint_is_embedding_failure() {
        let provider = HttpEmbeddingProvider::new(
            EmbeddingModelId::new("local", "all-MiniLM-L6-v2"),
            384,
            "http://127.0.0.1:1/v1",
            None,
            Duration::from_secs(2),
        );
        let err = provider.embed("hello").unwrap_err();
        assert!(matches!(err, DriftError::EmbeddingFailure(_)));
        assert!(provider.embed("").is_err());
    }
}
