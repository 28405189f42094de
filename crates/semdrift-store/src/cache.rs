// crates/semdrift-store/src/cache.rs
//
// File-per-entry embedding cache.
//
// Layout under the cache root:
//   - `embedding_{digest}.json`            -> JSON-serialized CacheEntry
//   - `.embedding_{digest}.{uuid}.tmp`     -> in-flight write (renamed into place)
//
// `{digest}` is the 128-bit hex content digest of the exact text.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use semdrift_core::digest::content_digest;
use semdrift_core::error::DriftError;
use semdrift_core::traits::EmbeddingProvider;

const ENTRY_PREFIX: &str = "embedding_";
const ENTRY_SUFFIX: &str = ".json";
const TEMP_PREFIX: &str = ".embedding_";
const TEMP_SUFFIX: &str = ".tmp";

/// One cached embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Content digest of the text this vector was computed from.
    pub content_hash: String,
    /// `provider/name` of the model that produced the vector.
    pub model_id: String,
    /// Vector length, stored redundantly as a corruption check.
    pub dimension: usize,
    pub vector: Vec<f32>,
}

/// Entry count and on-disk size of a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

/// Content-addressed embedding cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    root: PathBuf,
}

impl EmbeddingStore {
    /// Open (and create if missing) a cache rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, DriftError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            DriftError::Storage(format!(
                "Failed to create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path of the entry for `text`.
    pub fn entry_path(&self, text: &str) -> PathBuf {
        self.root
            .join(format!("{}{}{}", ENTRY_PREFIX, content_digest(text), ENTRY_SUFFIX))
    }

    /// Return the embedding for `text`, computing and persisting it on a miss.
    ///
    /// A stored entry produced by a different model than `provider` counts
    /// as a miss and is overwritten. A stored entry that cannot be parsed, or
    /// whose digest or dimension does not check out, is reported as
    /// `DriftError::Storage` rather than silently replaced.
    pub fn resolve(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
    ) -> Result<Vec<f32>, DriftError> {
        let model_id = provider.model_id().to_string();
        let digest = content_digest(text);

        if let Some(entry) = self.read_entry(&digest)? {
            if entry.model_id == model_id {
                if entry.dimension != provider.dimensions() {
                    return Err(DriftError::Storage(format!(
                        "Cache entry {} has {} dimensions but {} produces {}",
                        digest,
                        entry.dimension,
                        model_id,
                        provider.dimensions()
                    )));
                }
                tracing::debug!("Cache hit for {}", digest);
                return Ok(entry.vector);
            }
            tracing::warn!(
                "Cache entry {} was produced by {}, active model is {}; recomputing",
                digest,
                entry.model_id,
                model_id
            );
        } else {
            tracing::debug!("Cache miss for {}", digest);
        }

        let vector = provider.embed(text)?;
        if vector.len() != provider.dimensions() {
            return Err(DriftError::EmbeddingFailure(format!(
                "{} returned {} dimensions, expected {}",
                model_id,
                vector.len(),
                provider.dimensions()
            )));
        }

        let entry = CacheEntry {
            content_hash: digest,
            model_id,
            dimension: vector.len(),
            vector,
        };
        self.write_entry(&entry)?;
        Ok(entry.vector)
    }

    /// Look up a stored entry for `text` without invoking any model.
    pub fn lookup(&self, text: &str) -> Result<Option<CacheEntry>, DriftError> {
        self.read_entry(&content_digest(text))
    }

    /// Remove every cache entry (and leftover temp file) under the root.
    ///
    /// A missing root is not an error. Files that are not cache entries are
    /// left alone. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, DriftError> {
        let mut removed = 0;
        for path in self.list_files()? {
            let is_entry = is_entry_file(&path);
            if is_entry || is_temp_file(&path) {
                fs::remove_file(&path).map_err(|e| {
                    DriftError::Storage(format!("Failed to remove {}: {}", path.display(), e))
                })?;
                if is_entry {
                    removed += 1;
                }
            }
        }
        tracing::info!("Cleared {} cache entries from {}", removed, self.root.display());
        Ok(removed)
    }

    /// Count entries and their total size on disk.
    pub fn stats(&self) -> Result<CacheStats, DriftError> {
        let mut stats = CacheStats::default();
        for path in self.list_files()? {
            if !is_entry_file(&path) {
                continue;
            }
            let meta = fs::metadata(&path).map_err(|e| {
                DriftError::Storage(format!("Failed to stat {}: {}", path.display(), e))
            })?;
            stats.entries += 1;
            stats.total_bytes += meta.len();
        }
        Ok(stats)
    }

    /// Read and validate the entry for a digest. `Ok(None)` when absent.
    fn read_entry(&self, digest: &str) -> Result<Option<CacheEntry>, DriftError> {
        let path = self
            .root
            .join(format!("{}{}{}", ENTRY_PREFIX, digest, ENTRY_SUFFIX));
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DriftError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            DriftError::Storage(format!("Corrupt cache entry {}: {}", path.display(), e))
        })?;
        if entry.content_hash != digest || entry.dimension != entry.vector.len() {
            return Err(DriftError::Storage(format!(
                "Corrupt cache entry {}: digest or dimension does not match contents",
                path.display()
            )));
        }
        Ok(Some(entry))
    }

    /// Write an entry atomically: temp file in the same directory, then rename.
    fn write_entry(&self, entry: &CacheEntry) -> Result<(), DriftError> {
        let json = serde_json::to_vec(entry)?;
        let final_path = self.root.join(format!(
            "{}{}{}",
            ENTRY_PREFIX, entry.content_hash, ENTRY_SUFFIX
        ));
        let temp_path = self.root.join(format!(
            "{}{}.{}{}",
            TEMP_PREFIX,
            entry.content_hash,
            Uuid::now_v7(),
            TEMP_SUFFIX
        ));

        fs::write(&temp_path, &json).map_err(|e| {
            DriftError::Storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(DriftError::Storage(format!(
                "Failed to move cache entry into {}: {}",
                final_path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Regular files directly under the root. Empty when the root is gone.
    fn list_files(&self) -> Result<Vec<PathBuf>, DriftError> {
        let iter = match fs::read_dir(&self.root) {
            Ok(iter) => iter,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DriftError::Storage(format!(
                    "Failed to list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut files = Vec::new();
        for item in iter {
            let item = item.map_err(|e| {
                DriftError::Storage(format!("Failed to list {}: {}", self.root.display(), e))
            })?;
            let path = item.path();
            if path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn is_entry_file(path: &Path) -> bool {
    let name = file_name(path);
    name.starts_with(ENTRY_PREFIX) && name.ends_with(ENTRY_SUFFIX)
}

fn is_temp_file(path: &Path) -> bool {
    let name = file_name(path);
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}
