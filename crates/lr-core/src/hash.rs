//! Content digests for emitted assets.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of `bytes`.
///
/// Used as the per-asset content fingerprint when source hashing is enabled.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(result)
}
