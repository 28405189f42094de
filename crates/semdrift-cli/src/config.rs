// crates/semdrift-cli/src/config.rs
//
// Pipeline configuration for the semdrift CLI.
//
// Resolved once at startup from four layers, lowest precedence first:
// built-in defaults, a TOML file, `SEMDRIFT_*` environment variables, and
// explicit command-line arguments.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use semdrift_core::{DriftError, ProviderSettings};

/// Environment variable holding the API key for hosted embedding endpoints.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Runtime configuration for one pipeline invocation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Directory holding cached embeddings.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Embedding model as `provider/name` (e.g. "hash/sha256-384",
    /// "openai/text-embedding-3-small", "local/all-MiniLM-L6-v2").
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Base URL of an OpenAI-compatible embeddings API. Defaults per provider.
    #[serde(default)]
    pub embedding_endpoint: Option<String>,

    /// Output dimensionality for models whose size is not known by name.
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// When false, every embedding is computed and nothing is persisted.
    #[serde(default = "default_enable_cache")]
    pub enable_cache: bool,

    /// Path of the JSON results report.
    #[serde(default = "default_output")]
    pub output: String,

    /// Path of the SVG chart.
    #[serde(default = "default_chart")]
    pub chart: String,

    /// Path of the Markdown experiment data document.
    #[serde(default = "default_markdown")]
    pub markdown: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_dir() -> String {
    ".cache".to_string()
}

fn default_embedding_model() -> String {
    "hash/sha256-384".to_string()
}

fn default_enable_cache() -> bool {
    true
}

fn default_output() -> String {
    "docs/experiment_results.json".to_string()
}

fn default_chart() -> String {
    "screenshots/translation_distance_graph.svg".to_string()
}

fn default_markdown() -> String {
    "docs/experiment_data.md".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            embedding_model: default_embedding_model(),
            embedding_endpoint: None,
            embedding_dimensions: None,
            enable_cache: default_enable_cache(),
            output: default_output(),
            chart: default_chart(),
            markdown: default_markdown(),
            log_level: default_log_level(),
        }
    }
}

/// Values given explicitly on the command line. `None` leaves the lower
/// layers in effect.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub cache_dir: Option<String>,
    pub embedding_model: Option<String>,
    pub output: Option<String>,
    pub chart: Option<String>,
    pub markdown: Option<String>,
    /// `--no-cache`: only ever turns the cache off.
    pub no_cache: bool,
}

impl PipelineConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DriftError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            DriftError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| DriftError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Resolve the full configuration.
    ///
    /// An explicit `config_path` must exist; the default location
    /// (`~/.semdrift/config.toml`) is optional.
    pub fn resolve<F>(
        config_path: Option<&str>,
        overrides: &CliOverrides,
        env: F,
    ) -> Result<Self, DriftError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_path {
            Some(path) => Self::load(&expand_tilde(path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(env)?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Overlay `SEMDRIFT_*` variables read through `env`.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), DriftError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("SEMDRIFT_CACHE_DIR") {
            self.cache_dir = v;
        }
        if let Some(v) = env("SEMDRIFT_EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = env("SEMDRIFT_EMBEDDING_ENDPOINT") {
            self.embedding_endpoint = Some(v);
        }
        if let Some(v) = env("SEMDRIFT_EMBEDDING_DIMENSIONS") {
            let dims = v.trim().parse::<usize>().ok().filter(|d| *d > 0).ok_or_else(|| {
                DriftError::Config(format!(
                    "SEMDRIFT_EMBEDDING_DIMENSIONS must be a positive integer, got {:?}",
                    v
                ))
            })?;
            self.embedding_dimensions = Some(dims);
        }
        if let Some(v) = env("SEMDRIFT_ENABLE_CACHE") {
            self.enable_cache = parse_bool("SEMDRIFT_ENABLE_CACHE", &v)?;
        }
        if let Some(v) = env("SEMDRIFT_OUTPUT") {
            self.output = v;
        }
        if let Some(v) = env("SEMDRIFT_CHART") {
            self.chart = v;
        }
        if let Some(v) = env("SEMDRIFT_MARKDOWN") {
            self.markdown = v;
        }
        if let Some(v) = env("SEMDRIFT_LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }

    /// Overlay explicit command-line values.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(v) = &overrides.cache_dir {
            self.cache_dir = v.clone();
        }
        if let Some(v) = &overrides.embedding_model {
            self.embedding_model = v.clone();
        }
        if let Some(v) = &overrides.output {
            self.output = v.clone();
        }
        if let Some(v) = &overrides.chart {
            self.chart = v.clone();
        }
        if let Some(v) = &overrides.markdown {
            self.markdown = v.clone();
        }
        if overrides.no_cache {
            self.enable_cache = false;
        }
    }

    /// Provider settings; the API key is looked up through `env`.
    pub fn provider_settings<F>(&self, env: F) -> ProviderSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        ProviderSettings {
            endpoint: self.embedding_endpoint.clone(),
            api_key: env(API_KEY_VAR).filter(|k| !k.is_empty()),
            dimensions: self.embedding_dimensions,
            timeout_secs: None,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        expand_tilde(&self.cache_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        expand_tilde(&self.output)
    }

    pub fn chart_path(&self) -> PathBuf {
        expand_tilde(&self.chart)
    }

    pub fn markdown_path(&self) -> PathBuf {
        expand_tilde(&self.markdown)
    }
}

/// Process environment lookup.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".semdrift").join("config.toml"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DriftError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DriftError::Config(format!(
            "{} must be true or false, got {:?}",
            key, value
        ))),
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_temp_config(label: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("semdrift_test_{}_{}", label, Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_are_offline() {
        let config = PipelineConfig::default();
        assert_eq!(config.embedding_model, "hash/sha256-384");
        assert!(config.enable_cache);
        assert_eq!(config.cache_dir, ".cache");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            embedding_model = "local/all-MiniLM-L6-v2"
            enable_cache = false
            "#,
        )
        .unwrap();
        assert_eq!(config.embedding_model, "local/all-MiniLM-L6-v2");
        assert!(!config.enable_cache);
        assert_eq!(config.output, "docs/experiment_results.json");
    }

    #[test]
    fn env_overrides_file() {
        let path = write_temp_config("env_over_file", "cache_dir = \"from-file\"\nchart = \"file.svg\"\n");
        let env = env_from(&[("SEMDRIFT_CACHE_DIR", "from-env")]);
        let config =
            PipelineConfig::resolve(path.to_str(), &CliOverrides::default(), env).unwrap();
        assert_eq!(config.cache_dir, "from-env");
        assert_eq!(config.chart, "file.svg");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn cli_overrides_env() {
        let env = env_from(&[
            ("SEMDRIFT_EMBEDDING_MODEL", "hash/sha256-16"),
            ("SEMDRIFT_ENABLE_CACHE", "true"),
        ]);
        let overrides = CliOverrides {
            embedding_model: Some("hash/sha256-32".to_string()),
            no_cache: true,
            ..Default::default()
        };
        let mut config = PipelineConfig::default();
        config.apply_env(env).unwrap();
        config.apply_overrides(&overrides);
        assert_eq!(config.embedding_model, "hash/sha256-32");
        assert!(!config.enable_cache);
    }

    #[test]
    fn env_bool_parsing() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env_from(&[("SEMDRIFT_ENABLE_CACHE", "FALSE")]))
            .unwrap();
        assert!(!config.enable_cache);

        let err = config
            .apply_env(env_from(&[("SEMDRIFT_ENABLE_CACHE", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, DriftError::Config(_)));
    }

    #[test]
    fn env_dimensions_must_be_numeric() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env_from(&[("SEMDRIFT_EMBEDDING_DIMENSIONS", "512")]))
            .unwrap();
        assert_eq!(config.embedding_dimensions, Some(512));
        assert!(config
            .apply_env(env_from(&[("SEMDRIFT_EMBEDDING_DIMENSIONS", "wide")]))
            .is_err());
    }

    #[test]
    fn explicit_missing_config_is_error() {
        let err = PipelineConfig::resolve(
            Some("/nonexistent/semdrift/config.toml"),
            &CliOverrides::default(),
            no_env,
        )
        .unwrap_err();
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn invalid_toml_is_error() {
        let path = write_temp_config("bad_toml", "enable_cache = \"sometimes\"\n");
        assert!(PipelineConfig::load(&path).is_err());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn api_key_only_from_env() {
        let config = PipelineConfig::default();
        assert!(config.provider_settings(no_env).api_key.is_none());
        let settings = config.provider_settings(env_from(&[(API_KEY_VAR, "sk-test")]));
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        let empty = config.provider_settings(env_from(&[(API_KEY_VAR, "")]));
        assert!(empty.api_key.is_none());
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x/y"), home.join("x").join("y"));
        }
        assert_eq!(expand_tilde("relative/path"), PathBuf::from("relative/path"));
    }
}
