//! # Digests
//!
//! Two hash families are used across the workspace:
//!
//! | Use | Algorithm | Input |
//! |-----|-----------|-------|
//! | Rationale / message content | BLAKE3 | raw UTF-8 bytes |
//! | Versioned rule sets | SHA-256 | canonical JSON |
//!
//! Canonical JSON relies on `serde_json`'s default map type, which keeps
//! object keys sorted, so two structurally equal values always serialize to
//! the same bytes regardless of field insertion order.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{Hash, LedgerError, Result, HASH_SIZE};

/// Computes the BLAKE3 digest of a piece of text.
///
/// # Example
///
/// ```rust
/// use conclave_ledger::content_hash;
///
/// assert_eq!(content_hash("abc"), content_hash("abc"));
/// assert_ne!(content_hash("abc"), content_hash("abd"));
/// ```
pub fn content_hash(text: &str) -> Hash {
    *blake3::hash(text.as_bytes()).as_bytes()
}

/// Computes a SHA-256 digest over the canonical JSON form of `value`.
///
/// # Errors
///
/// Returns `LedgerError::Serialization` if `value` cannot be represented
/// as JSON.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> Result<Hash> {
    // Round-trip through Value so struct field order cannot leak into the digest
    let canonical = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().into())
}

/// Converts a byte slice into a fixed-width [`Hash`].
///
/// # Errors
///
/// Returns `LedgerError::InvalidHashLength` unless the slice is exactly
/// [`HASH_SIZE`] bytes long.
pub fn hash_from_slice(bytes: &[u8]) -> Result<Hash> {
    <Hash>::try_from(bytes).map_err(|_| LedgerError::InvalidHashLength {
        expected: HASH_SIZE,
        actual: bytes.len(),
    })
}

/// Lowercase hex rendering of a digest.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Serde adapter that writes a [`Hash`] as a lowercase hex string.
///
/// Use with `#[serde(with = "conclave_ledger::hex_hash")]`.
pub mod hex_hash {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::models::Hash;

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(de::Error::custom)?;
        crate::digest::hash_from_slice(&bytes).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_content_hash_matches_blake3() {
        let text = "The petition should be referred.";
        assert_eq!(content_hash(text), *blake3::hash(text.as_bytes()).as_bytes());
    }

    #[test]
    fn test_content_hash_single_char_change() {
        assert_ne!(content_hash("refer"), content_hash("refeR"));
    }

    #[test]
    fn test_canonical_hash_ignores_key_order() {
        let a = json!({"zebra": 1, "alpha": {"b": 2, "a": 1}});
        let b = json!({"alpha": {"a": 1, "b": 2}, "zebra": 1});
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn test_canonical_hash_detects_value_change() {
        let a = json!({"rules": ["a", "b"]});
        let b = json!({"rules": ["b", "a"]});
        assert_ne!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn test_hash_from_slice_rejects_wrong_width() {
        assert!(hash_from_slice(&[0u8; 32]).is_ok());
        let err = hash_from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidHashLength { expected: 32, actual: 31 }
        ));
        assert!(hash_from_slice(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_hash_to_hex() {
        let hex = hash_to_hex(&[0xab; 32]);
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("abab"));
    }

    #[derive(Serialize, Deserialize)]
    struct Wrapped {
        #[serde(with = "hex_hash")]
        digest: Hash,
    }

    #[test]
    fn test_hex_hash_serde() {
        let wrapped = Wrapped { digest: [7u8; 32] };
        let text = serde_json::to_string(&wrapped).unwrap();
        assert!(text.contains(&"07".repeat(32)));

        let parsed: Wrapped = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.digest, [7u8; 32]);

        let short = r#"{"digest":"abcd"}"#;
        assert!(serde_json::from_str::<Wrapped>(short).is_err());
    }
}
