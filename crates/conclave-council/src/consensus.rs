//! Supermajority consensus engine for archon deliberations.
//!
//! Resolves exactly three votes into a deterministic outcome. Any outcome
//! with two or more votes wins; a three-way split is an explicit failure,
//! never a silent default.
//!
//! ## Determinism
//!
//! Inputs arrive as a `HashMap`, whose iteration order is arbitrary. Every
//! derived collection (distribution, majority set) is ordered, so identical
//! vote maps always produce identical results. The algorithm version is
//! stamped into each result for replay auditing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conclave_ledger::TimeAuthority;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CouncilError;
use crate::model::{
    ArchonId, DeliberationSession, DispositionOutcome, PetitionId, SessionId, VoteMap,
    ARCHONS_PER_SESSION,
};
use crate::Result;

/// Version of the resolution algorithm stamped into every result.
pub const CONSENSUS_ALGORITHM_VERSION: &str = "supermajority-2of3/1.0.0";

/// Votes an outcome needs to win.
pub const SUPERMAJORITY_THRESHOLD: usize = 2;

/// Status of a consensus resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusStatus {
    /// All three archons agreed.
    Unanimous,
    /// Two of three agreed; one dissented.
    Achieved,
    /// No outcome reached the threshold.
    NotReached,
    /// The votes failed validation.
    Invalid,
}

impl ConsensusStatus {
    /// Returns true for statuses that carry a winning outcome.
    pub fn is_resolved(&self) -> bool {
        matches!(self, ConsensusStatus::Unanimous | ConsensusStatus::Achieved)
    }
}

/// Unchecked field set for a [`ConsensusResult`].
///
/// Convert with `ConsensusResult::try_from(draft)`, which enforces the
/// result invariants.
#[derive(Debug, Clone)]
pub struct ConsensusDraft {
    pub session_id: SessionId,
    pub petition_id: PetitionId,
    pub status: ConsensusStatus,
    pub winning_outcome: Option<DispositionOutcome>,
    pub vote_distribution: BTreeMap<DispositionOutcome, usize>,
    pub majority_archons: BTreeSet<ArchonId>,
    pub dissent_archon_id: Option<ArchonId>,
    pub resolved_at: DateTime<Utc>,
}

/// Outcome of resolving one session's votes.
///
/// Produced once and never mutated. Construction goes through
/// [`ConsensusDraft`] so every instance satisfies:
///
/// - `Unanimous`/`Achieved` carry a winning outcome and at least two
///   majority archons
/// - `Unanimous` has no dissenter
/// - a 2-1 split names exactly one dissenter outside the majority
/// - `NotReached`/`Invalid` carry neither winner nor dissenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusResult {
    session_id: SessionId,
    petition_id: PetitionId,
    status: ConsensusStatus,
    winning_outcome: Option<DispositionOutcome>,
    vote_distribution: BTreeMap<DispositionOutcome, usize>,
    majority_archons: BTreeSet<ArchonId>,
    dissent_archon_id: Option<ArchonId>,
    algorithm_version: String,
    resolved_at: DateTime<Utc>,
}

impl TryFrom<ConsensusDraft> for ConsensusResult {
    type Error = CouncilError;

    fn try_from(draft: ConsensusDraft) -> Result<Self> {
        let invalid = |detail: &str| CouncilError::InvalidConsensusResult {
            session_id: draft.session_id,
            detail: detail.to_string(),
        };

        match draft.status {
            ConsensusStatus::Unanimous | ConsensusStatus::Achieved => {
                let winner = draft
                    .winning_outcome
                    .ok_or_else(|| invalid("resolved status without winning outcome"))?;
                let expected_majority = match draft.status {
                    ConsensusStatus::Unanimous => ARCHONS_PER_SESSION,
                    _ => SUPERMAJORITY_THRESHOLD,
                };
                if draft.majority_archons.len() != expected_majority {
                    return Err(invalid("majority size does not match status"));
                }
                if draft.vote_distribution.get(&winner).copied() != Some(draft.majority_archons.len()) {
                    return Err(invalid("majority size disagrees with distribution"));
                }
                match (draft.status, &draft.dissent_archon_id) {
                    (ConsensusStatus::Unanimous, Some(_)) => {
                        return Err(invalid("unanimous result with dissenter"))
                    }
                    (ConsensusStatus::Achieved, None) => return Err(invalid("2-1 split without dissenter")),
                    (ConsensusStatus::Achieved, Some(d)) if draft.majority_archons.contains(d) => {
                        return Err(invalid("dissenter is in the majority"))
                    }
                    _ => {}
                }
            }
            ConsensusStatus::NotReached | ConsensusStatus::Invalid => {
                if draft.winning_outcome.is_some() || draft.dissent_archon_id.is_some() {
                    return Err(invalid("unresolved status with winner or dissenter"));
                }
            }
        }

        Ok(Self {
            session_id: draft.session_id,
            petition_id: draft.petition_id,
            status: draft.status,
            winning_outcome: draft.winning_outcome,
            vote_distribution: draft.vote_distribution,
            majority_archons: draft.majority_archons,
            dissent_archon_id: draft.dissent_archon_id,
            algorithm_version: CONSENSUS_ALGORITHM_VERSION.to_string(),
            resolved_at: draft.resolved_at,
        })
    }
}

impl ConsensusResult {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn petition_id(&self) -> PetitionId {
        self.petition_id
    }

    pub fn status(&self) -> ConsensusStatus {
        self.status
    }

    pub fn winning_outcome(&self) -> Option<DispositionOutcome> {
        self.winning_outcome
    }

    /// Number of votes per outcome; outcomes with no votes are absent.
    pub fn vote_distribution(&self) -> &BTreeMap<DispositionOutcome, usize> {
        &self.vote_distribution
    }

    pub fn majority_archons(&self) -> &BTreeSet<ArchonId> {
        &self.majority_archons
    }

    pub fn dissent_archon_id(&self) -> Option<&ArchonId> {
        self.dissent_archon_id.as_ref()
    }

    /// Returns true for a 2-1 split.
    pub fn has_dissent(&self) -> bool {
        self.dissent_archon_id.is_some()
    }

    pub fn algorithm_version(&self) -> &str {
        &self.algorithm_version
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// Which vote check failed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteValidationStatus {
    /// All checks passed.
    Valid,
    /// An assigned archon has not voted.
    MissingVotes,
    /// A vote came from an archon not assigned to the session.
    UnauthorizedVoter,
    /// A vote names an outcome the engine does not permit.
    InvalidOutcome,
}

/// Result of checking a vote map against its session.
///
/// Every offending set is filled in, even though `status` only reports the
/// highest-priority violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteValidationResult {
    pub is_valid: bool,
    pub status: VoteValidationStatus,
    pub unauthorized_archons: BTreeSet<ArchonId>,
    pub missing_archons: BTreeSet<ArchonId>,
    pub invalid_outcome_archons: BTreeSet<ArchonId>,
}

/// Consensus resolution port.
///
/// [`ConsensusEngine`] is the production implementation; test doubles
/// share this contract.
pub trait ConsensusResolver: Send + Sync {
    /// Checks that `votes` come from exactly the session's assigned archons
    /// and name permitted outcomes.
    fn validate_votes(&self, session: &DeliberationSession, votes: &VoteMap) -> VoteValidationResult;

    /// Resolves `votes` into a consensus result.
    ///
    /// # Errors
    ///
    /// - `CouncilError::VoteValidation` when validation fails
    /// - `CouncilError::ConsensusNotReached` on a three-way split
    fn resolve_consensus(&self, session: &DeliberationSession, votes: &VoteMap) -> Result<ConsensusResult>;

    /// Pure check: exactly three votes with some outcome holding two.
    fn can_reach_consensus(&self, votes: &VoteMap) -> bool;
}

/// Deterministic 2-of-3 supermajority engine.
///
/// # Voting Rules
///
/// - Exactly the three assigned archons must vote
/// - 3/3 agreement → `Unanimous`, no dissenter
/// - 2/3 agreement → `Achieved`, the third archon dissents
/// - three distinct outcomes → `ConsensusNotReached` error
pub struct ConsensusEngine {
    permitted_outcomes: BTreeSet<DispositionOutcome>,
    clock: Arc<dyn TimeAuthority>,
}

impl ConsensusEngine {
    /// Creates an engine that permits every outcome.
    pub fn new(clock: Arc<dyn TimeAuthority>) -> Self {
        Self {
            permitted_outcomes: DispositionOutcome::ALL.into_iter().collect(),
            clock,
        }
    }

    /// Restricts the outcomes archons may vote for.
    #[must_use]
    pub fn with_permitted_outcomes(mut self, outcomes: impl IntoIterator<Item = DispositionOutcome>) -> Self {
        self.permitted_outcomes = outcomes.into_iter().collect();
        self
    }

    /// Outcomes this engine accepts.
    pub fn permitted_outcomes(&self) -> &BTreeSet<DispositionOutcome> {
        &self.permitted_outcomes
    }

    fn distribution(votes: &VoteMap) -> BTreeMap<DispositionOutcome, usize> {
        let mut counts = BTreeMap::new();
        for outcome in votes.values() {
            *counts.entry(*outcome).or_insert(0) += 1;
        }
        counts
    }
}

impl ConsensusResolver for ConsensusEngine {
    fn validate_votes(&self, session: &DeliberationSession, votes: &VoteMap) -> VoteValidationResult {
        let unauthorized: BTreeSet<ArchonId> = votes
            .keys()
            .filter(|archon| !session.is_assigned(archon))
            .cloned()
            .collect();
        let missing: BTreeSet<ArchonId> = session
            .assigned_archons()
            .iter()
            .filter(|archon| !votes.contains_key(*archon))
            .cloned()
            .collect();
        let invalid: BTreeSet<ArchonId> = votes
            .iter()
            .filter(|(_, outcome)| !self.permitted_outcomes.contains(outcome))
            .map(|(archon, _)| archon.clone())
            .collect();

        let status = if !unauthorized.is_empty() {
            VoteValidationStatus::UnauthorizedVoter
        } else if !missing.is_empty() {
            VoteValidationStatus::MissingVotes
        } else if !invalid.is_empty() {
            VoteValidationStatus::InvalidOutcome
        } else {
            VoteValidationStatus::Valid
        };

        VoteValidationResult {
            is_valid: status == VoteValidationStatus::Valid,
            status,
            unauthorized_archons: unauthorized,
            missing_archons: missing,
            invalid_outcome_archons: invalid,
        }
    }

    fn resolve_consensus(&self, session: &DeliberationSession, votes: &VoteMap) -> Result<ConsensusResult> {
        let session_id = session.session_id();
        debug!("Resolving consensus for session {}", session_id);

        let validation = self.validate_votes(session, votes);
        if !validation.is_valid {
            warn!(
                "Vote validation failed for session {}: {:?}",
                session_id, validation.status
            );
            return Err(CouncilError::VoteValidation {
                session_id,
                status: validation.status,
                unauthorized: validation.unauthorized_archons.into_iter().collect(),
                missing: validation.missing_archons.into_iter().collect(),
                invalid_outcome: validation.invalid_outcome_archons.into_iter().collect(),
            });
        }

        let distribution = Self::distribution(votes);
        let winner = distribution
            .iter()
            .find(|(_, count)| **count >= SUPERMAJORITY_THRESHOLD)
            .map(|(outcome, _)| *outcome);

        let Some(winner) = winner else {
            warn!("Consensus not reached for session {}: three-way split", session_id);
            return Err(CouncilError::ConsensusNotReached {
                session_id,
                petition_id: session.petition_id(),
                votes_received: votes.len(),
                votes_required: SUPERMAJORITY_THRESHOLD,
            });
        };

        let majority: BTreeSet<ArchonId> = votes
            .iter()
            .filter(|(_, outcome)| **outcome == winner)
            .map(|(archon, _)| archon.clone())
            .collect();
        let dissenters: BTreeSet<&ArchonId> = votes
            .iter()
            .filter(|(_, outcome)| **outcome != winner)
            .map(|(archon, _)| archon)
            .collect();

        let (status, dissent) = if majority.len() == ARCHONS_PER_SESSION {
            (ConsensusStatus::Unanimous, None)
        } else {
            (ConsensusStatus::Achieved, dissenters.into_iter().next().cloned())
        };

        let result = ConsensusResult::try_from(ConsensusDraft {
            session_id,
            petition_id: session.petition_id(),
            status,
            winning_outcome: Some(winner),
            vote_distribution: distribution,
            majority_archons: majority,
            dissent_archon_id: dissent,
            resolved_at: self.clock.now(),
        })?;

        info!(
            "Session {} resolved {:?} -> {} (dissent: {})",
            session_id,
            result.status(),
            winner,
            result
                .dissent_archon_id()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );
        Ok(result)
    }

    fn can_reach_consensus(&self, votes: &VoteMap) -> bool {
        votes.len() == ARCHONS_PER_SESSION
            && Self::distribution(votes)
                .values()
                .any(|count| *count >= SUPERMAJORITY_THRESHOLD)
    }
}
