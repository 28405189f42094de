// crates/semdrift-store/src/lib.rs
//
// semdrift-store: Storage layer for semdrift.
//
// Provides the embedding cache: one JSON file per unique text, named by a
// 128-bit content digest, tagged with the model that produced the vector.
// Entries are independently inspectable and removable; writes are atomic
// renames so concurrent processes sharing a cache directory cannot observe
// a half-written entry.

pub mod cache;

// Re-export key types for ergonomic access from downstream crates.
pub use cache::{CacheEntry, CacheStats, EmbeddingStore};
