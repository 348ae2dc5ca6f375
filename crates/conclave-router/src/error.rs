//! Error types for disposition routing.
//!
//! Every routing failure names the session or petition it concerns. No
//! failure is resolved by dropping the petition; its state is left as it
//! was.

use conclave_council::{
    ConsensusStatus, DeliberationPhase, DispositionOutcome, PetitionId, SessionId,
};
use thiserror::Error;

use crate::model::PetitionState;

/// Errors that can occur while routing a disposition.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// One or more deliberation phases have no transcript hash.
    #[error(
        "Incomplete witness chain for session {session_id} (petition {petition_id}): missing {}",
        phase_list(.missing_phases)
    )]
    IncompleteWitnessChain {
        session_id: SessionId,
        petition_id: PetitionId,
        missing_phases: Vec<DeliberationPhase>,
    },

    #[error("Petition {petition_id} is {actual:?}, expected {expected:?}")]
    InvalidPetitionState {
        petition_id: PetitionId,
        actual: PetitionState,
        expected: PetitionState,
    },

    /// The routing table has no pipeline for the outcome.
    #[error("No pipeline mapped for outcome {outcome} (session {session_id}, petition {petition_id})")]
    UnmappedOutcome {
        session_id: SessionId,
        petition_id: PetitionId,
        outcome: DispositionOutcome,
    },

    #[error("Consensus for session {session_id} is not resolved ({status:?})")]
    ConsensusNotResolved {
        session_id: SessionId,
        status: ConsensusStatus,
    },

    #[error("Session mismatch: expected {expected}, got {actual}")]
    SessionMismatch {
        expected: SessionId,
        actual: SessionId,
    },

    #[error("Session {session_id} deliberated petition {expected}, not {actual}")]
    PetitionMismatch {
        session_id: SessionId,
        expected: PetitionId,
        actual: PetitionId,
    },

    /// An event failed its own construction checks.
    #[error("Invalid routing event for session {session_id}: {detail}")]
    InvalidEvent { session_id: SessionId, detail: String },

    #[error("Petition {petition_id} was already routed by session {session_id}")]
    PetitionAlreadyRouted {
        petition_id: PetitionId,
        session_id: SessionId,
    },
}

fn phase_list(phases: &[DeliberationPhase]) -> String {
    phases
        .iter()
        .map(DeliberationPhase::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_witness_chain_names_phases() {
        let err = RoutingError::IncompleteWitnessChain {
            session_id: SessionId::new(),
            petition_id: PetitionId::new(),
            missing_phases: vec![DeliberationPhase::CrossExamination, DeliberationPhase::Vote],
        };
        assert!(err.to_string().ends_with("missing CROSS_EXAMINATION, VOTE"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = RoutingError::InvalidPetitionState {
            petition_id: PetitionId::new(),
            actual: PetitionState::Received,
            expected: PetitionState::Deliberating,
        };
        assert!(err.to_string().contains("Received"));
        assert!(err.to_string().contains("Deliberating"));
    }
}
