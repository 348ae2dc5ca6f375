//! # Core Data Models for the Ledger Boundary
//!
//! Fixed-width digest type and the error enum shared by the digest, event
//! and storage modules.

use thiserror::Error;

/// Digest output size in bytes.
///
/// Both BLAKE3 (default output) and SHA-256 produce 32-byte digests, so a
/// single width covers witness hashes, rationale hashes and rule-set hashes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte digest value.
///
/// This type alias gives semantic meaning to raw byte arrays, making it
/// clear when a value is a digest rather than arbitrary data. The width is
/// enforced by the type; slices of other lengths are rejected by
/// [`crate::hash_from_slice`].
pub type Hash = [u8; HASH_SIZE];

/// Errors that can occur at the ledger boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The embedded database failed.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// An event or record could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A digest had the wrong width.
    #[error("Invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength {
        /// Required width.
        expected: usize,
        /// Width actually supplied.
        actual: usize,
    },

    /// A stored entry could not be decoded.
    #[error("Corrupt ledger entry at sequence {sequence}: {detail}")]
    CorruptEntry {
        /// Sequence number of the bad entry.
        sequence: u64,
        /// What went wrong.
        detail: String,
    },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_hash_length_display() {
        let err = LedgerError::InvalidHashLength {
            expected: HASH_SIZE,
            actual: 31,
        };
        let msg = err.to_string();
        assert!(msg.contains("32"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn test_corrupt_entry_display() {
        let err = LedgerError::CorruptEntry {
            sequence: 7,
            detail: "truncated".to_string(),
        };
        assert!(err.to_string().contains("sequence 7"));
    }
}
