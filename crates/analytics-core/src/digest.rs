//! Content fingerprints for emitted nodes.
//!
//! A fingerprint is the lowercase hex SHA-256 of the compact JSON encoding of
//! a record's fingerprint fields. Struct field order fixes the key order, so
//! equal field values always hash to the same digest.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Hex SHA-256 of raw bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of any serializable value, via its compact JSON encoding.
pub fn digest_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let encoded = serde_json::to_vec(value)?;
    Ok(digest_bytes(&encoded))
}
