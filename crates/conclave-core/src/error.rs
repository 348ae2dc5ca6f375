//! Error types for Conclave Core.

use thiserror::Error;

/// Core error type for conclave operations.
#[derive(Debug, Error)]
pub enum ConclaveError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Consensus or dissent error passthrough.
    #[error("Council error: {0}")]
    Council(#[from] conclave_council::CouncilError),

    /// Filter plumbing error passthrough.
    #[error("Filter error: {0}")]
    Filter(#[from] conclave_filter::FilterError),

    /// Routing error passthrough.
    #[error("Routing error: {0}")]
    Routing(#[from] conclave_router::RoutingError),

    /// Ledger error passthrough.
    #[error("Ledger error: {0}")]
    Ledger(#[from] conclave_ledger::LedgerError),

    /// The sender refused filtered content.
    #[error("Delivery error: {0}")]
    Delivery(#[from] conclave_filter::DeliveryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_council::{PetitionId, SessionId};

    #[test]
    fn test_component_errors_convert() {
        let err: ConclaveError = conclave_council::CouncilError::ConsensusNotReached {
            session_id: SessionId::new(),
            petition_id: PetitionId::new(),
            votes_received: 3,
            votes_required: 2,
        }
        .into();
        assert!(matches!(err, ConclaveError::Council(_)));
        assert!(err.to_string().starts_with("Council error:"));

        let err: ConclaveError = conclave_filter::DeliveryError::UnknownRecipient("archon-9".to_string()).into();
        assert!(err.to_string().contains("archon-9"));
    }
}
