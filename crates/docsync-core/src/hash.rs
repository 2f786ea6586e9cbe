//! Content hashing for change detection.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Whether `data` differs from what was recorded as `stored`.
///
/// A missing stored hash means the artifact was never processed, which
/// counts as changed.
pub fn is_changed(data: &[u8], stored: Option<&str>) -> bool {
    match stored {
        Some(prev) => !content_hash(data).eq_ignore_ascii_case(prev),
        None => true,
    }
}
