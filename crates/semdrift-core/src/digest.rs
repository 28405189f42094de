// crates/semdrift-core/src/digest.rs
//
// Content digests used to key cached embeddings.

use sha2::{Digest, Sha256};

/// Number of digest bytes kept for cache keys (128 bits).
pub const CONTENT_DIGEST_BYTES: usize = 16;

/// Compute SHA-256 hash of the given bytes.
///
/// Returns a 32-byte hash.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Stable 128-bit content digest of a text, hex encoded (32 chars).
///
/// The text is hashed exactly as given: no trimming, no case folding, no
/// Unicode normalization. Byte-identical input is the only thing that maps
/// to the same digest.
pub fn content_digest(text: &str) -> String {
    let hash = hash_bytes(text.as_bytes());
    hex::encode(&hash[..CONTENT_DIGEST_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let data = b"semantic drift";
        let hash = hash_bytes(data);
        assert_eq!(hash.len(), 32);

        // Same input should produce same hash
        let hash2 = hash_bytes(data);
        assert_eq!(hash, hash2);

        // Different input should produce different hash
        let hash3 = hash_bytes(b"different");
        assert_ne!(hash, hash3);
    }

    #[test]
    fn test_content_digest_is_128_bit_hex() {
        let digest = content_digest("The quick brown fox");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, content_digest("The quick brown fox"));
    }

    #[test]
    fn test_content_digest_is_byte_exact() {
        let base = content_digest("hello world");
        assert_ne!(base, content_digest("hello world "));
        assert_ne!(base, content_digest("Hello world"));
        assert_ne!(base, content_digest(" hello world"));
    }

    #[test]
    fn test_content_digest_known_prefix() {
        // SHA-256("") = e3b0c442 98fc1c14 9afbf4c8 996fb924 ...
        assert_eq!(content_digest(""), "e3b0c44298fc1c149afbf4c8996fb924");
    }
}
