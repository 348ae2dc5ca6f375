//! Error types for the coercion filter.
//!
//! Filtering itself never fails: faults inside the stages become REJECTED
//! results. These errors cover the surrounding plumbing (library
//! construction, audit persistence, delivery).

use conclave_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur outside the filter stages.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Two patterns in one library share an id.
    #[error("Duplicate pattern id '{0}' in pattern library")]
    DuplicatePattern(String),

    #[error("Pattern library version must not be empty")]
    EmptyLibraryVersion,

    /// The decision log store rejected an entry.
    #[error("Decision log storage error for decision {decision_id}: {detail}")]
    DecisionStore { decision_id: uuid::Uuid, detail: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_pattern_display() {
        let err = FilterError::DuplicatePattern("xfm-001".to_string());
        assert!(err.to_string().contains("xfm-001"));
    }

    #[test]
    fn test_ledger_error_converts() {
        let err: FilterError = LedgerError::InvalidHashLength {
            expected: 32,
            actual: 4,
        }
        .into();
        assert!(matches!(err, FilterError::Ledger(_)));
    }
}
