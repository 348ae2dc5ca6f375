//! Error types for the deliberation council.
//!
//! Every variant carries the session (and where relevant archon) it
//! concerns, so errors can be correlated without extra context.

use conclave_ledger::LedgerError;
use thiserror::Error;

use crate::consensus::{ConsensusStatus, VoteValidationStatus};
use crate::model::{ArchonId, DeliberationPhase, DispositionOutcome, PetitionId, SessionId};

/// Errors that can occur during council operations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// A disposition outcome string could not be parsed.
    #[error("Unknown disposition outcome '{0}'")]
    UnknownOutcome(String),

    #[error("Session {session_id} requires exactly 3 archons, got {count}")]
    InvalidArchonCount { session_id: SessionId, count: usize },

    #[error("Archon '{archon_id}' assigned twice to session {session_id}")]
    DuplicateArchon {
        session_id: SessionId,
        archon_id: ArchonId,
    },

    /// A vote came from an archon outside the session.
    #[error("Archon '{archon_id}' is not assigned to session {session_id}")]
    UnauthorizedArchon {
        session_id: SessionId,
        archon_id: ArchonId,
    },

    #[error("Archon '{archon_id}' already voted in session {session_id}")]
    DuplicateVote {
        session_id: SessionId,
        archon_id: ArchonId,
    },

    /// The session already reached its terminal phase.
    #[error("Session {session_id} is already complete")]
    SessionComplete { session_id: SessionId },

    #[error("Phase {phase:?} cannot be witnessed in session {session_id}")]
    InvalidPhase {
        session_id: SessionId,
        phase: DeliberationPhase,
    },

    /// Votes failed validation against the session.
    #[error(
        "Vote validation failed for session {session_id} ({status:?}): unauthorized=[{}], missing=[{}], invalid_outcome=[{}]",
        join(.unauthorized), join(.missing), join(.invalid_outcome)
    )]
    VoteValidation {
        session_id: SessionId,
        status: VoteValidationStatus,
        unauthorized: Vec<ArchonId>,
        missing: Vec<ArchonId>,
        invalid_outcome: Vec<ArchonId>,
    },

    /// No outcome reached the supermajority threshold.
    #[error(
        "Consensus not reached for session {session_id} (petition {petition_id}): {votes_received} votes, no outcome with {votes_required}"
    )]
    ConsensusNotReached {
        session_id: SessionId,
        petition_id: PetitionId,
        votes_received: usize,
        votes_required: usize,
    },

    /// A consensus result violated its structural invariants.
    #[error("Invalid consensus result for session {session_id}: {detail}")]
    InvalidConsensusResult { session_id: SessionId, detail: String },

    #[error("Session mismatch: expected {expected}, got {actual}")]
    SessionMismatch {
        expected: SessionId,
        actual: SessionId,
    },

    #[error("Consensus for session {session_id} is not resolved ({status:?})")]
    ConsensusNotResolved {
        session_id: SessionId,
        status: ConsensusStatus,
    },

    /// The dissenter's vote is unknown and cannot be inferred uniquely.
    #[error(
        "Cannot determine vote of dissenter '{archon_id}' in session {session_id}: candidates {candidates:?}"
    )]
    AmbiguousDissent {
        session_id: SessionId,
        archon_id: ArchonId,
        candidates: Vec<DispositionOutcome>,
    },

    #[error("Dissenter '{archon_id}' in session {session_id} voted with the majority ({outcome})")]
    DissentMatchesMajority {
        session_id: SessionId,
        archon_id: ArchonId,
        outcome: DispositionOutcome,
    },

    #[error("Dissent already recorded for session {session_id}")]
    DissentAlreadyRecorded { session_id: SessionId },

    #[error("Invalid rationale hash for session {session_id}: {detail}")]
    InvalidRationaleHash { session_id: SessionId, detail: String },

    /// Dissent store failure.
    #[error("Dissent storage error: {detail}")]
    Storage { detail: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

fn join(ids: &[ArchonId]) -> String {
    ids.iter().map(ArchonId::as_str).collect::<Vec<_>>().join(", ")
}
