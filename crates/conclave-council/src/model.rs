//! Deliberation data model.
//!
//! Identifiers, outcomes, phases and the [`DeliberationSession`] that
//! collects witness hashes and votes for one petition.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use conclave_ledger::{hex_hash, Hash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consensus::ConsensusResult;
use crate::error::CouncilError;
use crate::Result;

/// Number of archons assigned to every deliberation.
pub const ARCHONS_PER_SESSION: usize = 3;

/// Identifier of a deliberation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a petition under deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetitionId(Uuid);

impl PetitionId {
    /// Creates a fresh random petition id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PetitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an archon (voter).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchonId(String);

impl ArchonId {
    /// Creates an archon id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchonId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Disposition an archon can vote for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispositionOutcome {
    /// Acknowledge the petition without further action.
    Acknowledge,
    /// Refer the petition to a domain reviewer.
    Refer,
    /// Escalate the petition for higher-level review.
    Escalate,
}

impl DispositionOutcome {
    /// Every outcome, in canonical order.
    pub const ALL: [DispositionOutcome; 3] = [
        DispositionOutcome::Acknowledge,
        DispositionOutcome::Refer,
        DispositionOutcome::Escalate,
    ];

    /// Stable string name used in serialized payloads.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DispositionOutcome::Acknowledge => "ACKNOWLEDGE",
            DispositionOutcome::Refer => "REFER",
            DispositionOutcome::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for DispositionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispositionOutcome {
    type Err = CouncilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CouncilError::UnknownOutcome(s.to_string()))
    }
}

/// Phase of a deliberation, in the order the phases happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliberationPhase {
    /// Each archon assesses the petition independently.
    Assessment,
    /// Archons state their positions.
    Position,
    /// Archons challenge each other's positions.
    CrossExamination,
    /// Votes are cast.
    Vote,
    /// Terminal: an outcome has been set.
    Complete,
}

impl DeliberationPhase {
    /// Phases that must carry a transcript hash before completion.
    pub const WITNESSED: [DeliberationPhase; 4] = [
        DeliberationPhase::Assessment,
        DeliberationPhase::Position,
        DeliberationPhase::CrossExamination,
        DeliberationPhase::Vote,
    ];

    /// Stable string name used in serialized payloads.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeliberationPhase::Assessment => "ASSESSMENT",
            DeliberationPhase::Position => "POSITION",
            DeliberationPhase::CrossExamination => "CROSS_EXAMINATION",
            DeliberationPhase::Vote => "VOTE",
            DeliberationPhase::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for DeliberationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vote as cast inside a session, with the archon's rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    /// The outcome voted for.
    pub outcome: DispositionOutcome,
    /// The archon's stated reasoning.
    pub rationale: String,
}

/// Bare archon → outcome map handed to the consensus engine.
pub type VoteMap = HashMap<ArchonId, DispositionOutcome>;

/// Transcript hash recorded for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessHash(#[serde(with = "hex_hash")] pub Hash);

/// One petition's deliberation among exactly three archons.
///
/// A session is mutated only by recording phase transcripts and casting
/// votes, and becomes terminal once [`complete`](Self::complete) sets an
/// outcome.
///
/// # Example
///
/// ```rust
/// use conclave_council::{ArchonId, DeliberationSession, DispositionOutcome, PetitionId, SessionId};
///
/// let mut session = DeliberationSession::new(
///     SessionId::new(),
///     PetitionId::new(),
///     ["a", "b", "c"].map(ArchonId::from),
/// ).unwrap();
///
/// session.cast_vote(&ArchonId::from("a"), DispositionOutcome::Refer, "needs review").unwrap();
/// assert_eq!(session.vote_of(&ArchonId::from("a")), Some(DispositionOutcome::Refer));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct DeliberationSession {
    session_id: SessionId,
    petition_id: PetitionId,
    assigned_archons: [ArchonId; ARCHONS_PER_SESSION],
    phase: DeliberationPhase,
    phase_transcripts: BTreeMap<DeliberationPhase, WitnessHash>,
    votes: BTreeMap<ArchonId, CastVote>,
    outcome: Option<DispositionOutcome>,
    dissent_archon_id: Option<ArchonId>,
    completed_at: Option<DateTime<Utc>>,
}

impl DeliberationSession {
    /// Opens a session for a petition.
    ///
    /// # Errors
    ///
    /// - `CouncilError::InvalidArchonCount` unless exactly three archons are given
    /// - `CouncilError::DuplicateArchon` if an archon appears twice
    pub fn new(
        session_id: SessionId,
        petition_id: PetitionId,
        archons: impl IntoIterator<Item = ArchonId>,
    ) -> Result<Self> {
        let archons: Vec<ArchonId> = archons.into_iter().collect();
        let count = archons.len();
        let assigned: [ArchonId; ARCHONS_PER_SESSION] = archons
            .try_into()
            .map_err(|_| CouncilError::InvalidArchonCount { session_id, count })?;

        for (i, archon) in assigned.iter().enumerate() {
            if assigned[..i].contains(archon) {
                return Err(CouncilError::DuplicateArchon {
                    session_id,
                    archon_id: archon.clone(),
                });
            }
        }

        Ok(Self {
            session_id,
            petition_id,
            assigned_archons: assigned,
            phase: DeliberationPhase::Assessment,
            phase_transcripts: BTreeMap::new(),
            votes: BTreeMap::new(),
            outcome: None,
            dissent_archon_id: None,
            completed_at: None,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn petition_id(&self) -> PetitionId {
        self.petition_id
    }

    pub fn assigned_archons(&self) -> &[ArchonId; ARCHONS_PER_SESSION] {
        &self.assigned_archons
    }

    /// Returns true if `archon` is one of the three assigned archons.
    pub fn is_assigned(&self, archon: &ArchonId) -> bool {
        self.assigned_archons.contains(archon)
    }

    pub fn phase(&self) -> DeliberationPhase {
        self.phase
    }

    /// Transcript hash recorded for `phase`, if any.
    pub fn transcript(&self, phase: DeliberationPhase) -> Option<&Hash> {
        self.phase_transcripts.get(&phase).map(|w| &w.0)
    }

    /// Witnessed phases that have no transcript yet, in phase order.
    pub fn missing_witness_phases(&self) -> Vec<DeliberationPhase> {
        DeliberationPhase::WITNESSED
            .into_iter()
            .filter(|p| !self.phase_transcripts.contains_key(p))
            .collect()
    }

    /// All cast votes with rationale, ordered by archon id.
    pub fn votes(&self) -> &BTreeMap<ArchonId, CastVote> {
        &self.votes
    }

    /// The outcome `archon` voted for, if they voted.
    pub fn vote_of(&self, archon: &ArchonId) -> Option<DispositionOutcome> {
        self.votes.get(archon).map(|v| v.outcome)
    }

    /// Rationale `archon` gave with their vote.
    pub fn rationale_of(&self, archon: &ArchonId) -> Option<&str> {
        self.votes.get(archon).map(|v| v.rationale.as_str())
    }

    /// Votes as a bare archon → outcome map for the consensus engine.
    pub fn vote_map(&self) -> VoteMap {
        self.votes
            .iter()
            .map(|(archon, vote)| (archon.clone(), vote.outcome))
            .collect()
    }

    pub fn outcome(&self) -> Option<DispositionOutcome> {
        self.outcome
    }

    pub fn dissent_archon_id(&self) -> Option<&ArchonId> {
        self.dissent_archon_id.as_ref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns true once an outcome has been set.
    pub fn is_complete(&self) -> bool {
        self.phase == DeliberationPhase::Complete
    }

    /// Records the transcript hash for a witnessed phase.
    ///
    /// The session's current phase moves forward to `phase` if it was
    /// behind; it never moves backwards.
    ///
    /// # Errors
    ///
    /// - `CouncilError::SessionComplete` once the session is terminal
    /// - `CouncilError::InvalidPhase` for [`DeliberationPhase::Complete`]
    pub fn record_transcript(&mut self, phase: DeliberationPhase, hash: Hash) -> Result<()> {
        self.ensure_open()?;
        if phase == DeliberationPhase::Complete {
            return Err(CouncilError::InvalidPhase {
                session_id: self.session_id,
                phase,
            });
        }

        self.phase_transcripts.insert(phase, WitnessHash(hash));
        if phase > self.phase {
            self.phase = phase;
        }
        Ok(())
    }

    /// Casts `archon`'s vote.
    ///
    /// # Errors
    ///
    /// - `CouncilError::SessionComplete` once the session is terminal
    /// - `CouncilError::UnauthorizedArchon` if `archon` is not assigned
    /// - `CouncilError::DuplicateVote` if `archon` already voted
    pub fn cast_vote(
        &mut self,
        archon: &ArchonId,
        outcome: DispositionOutcome,
        rationale: impl Into<String>,
    ) -> Result<()> {
        self.ensure_open()?;
        if !self.is_assigned(archon) {
            return Err(CouncilError::UnauthorizedArchon {
                session_id: self.session_id,
                archon_id: archon.clone(),
            });
        }
        if self.votes.contains_key(archon) {
            return Err(CouncilError::DuplicateVote {
                session_id: self.session_id,
                archon_id: archon.clone(),
            });
        }

        self.votes.insert(
            archon.clone(),
            CastVote {
                outcome,
                rationale: rationale.into(),
            },
        );
        if self.phase < DeliberationPhase::Vote {
            self.phase = DeliberationPhase::Vote;
        }
        Ok(())
    }

    /// Applies a resolved consensus, making the session terminal.
    ///
    /// # Errors
    ///
    /// - `CouncilError::SessionComplete` if already terminal
    /// - `CouncilError::SessionMismatch` if `result` belongs to another session
    /// - `CouncilError::ConsensusNotResolved` if `result` carries no outcome
    pub fn complete(&mut self, result: &ConsensusResult) -> Result<()> {
        self.ensure_open()?;
        if result.session_id() != self.session_id {
            return Err(CouncilError::SessionMismatch {
                expected: self.session_id,
                actual: result.session_id(),
            });
        }
        let outcome = result
            .winning_outcome()
            .ok_or(CouncilError::ConsensusNotResolved {
                session_id: self.session_id,
                status: result.status(),
            })?;

        self.outcome = Some(outcome);
        self.dissent_archon_id = result.dissent_archon_id().cloned();
        self.completed_at = Some(result.resolved_at());
        self.phase = DeliberationPhase::Complete;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_complete() {
            Err(CouncilError::SessionComplete {
                session_id: self.session_id,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archons() -> [ArchonId; 3] {
        ["alpha", "beta", "gamma"].map(ArchonId::from)
    }

    fn session() -> DeliberationSession {
        DeliberationSession::new(SessionId::new(), PetitionId::new(), archons()).unwrap()
    }

    #[test]
    fn test_session_requires_three_archons() {
        let two = ["a", "b"].map(ArchonId::from);
        let err = DeliberationSession::new(SessionId::new(), PetitionId::new(), two).unwrap_err();
        assert!(matches!(err, CouncilError::InvalidArchonCount { count: 2, .. }));

        let four = ["a", "b", "c", "d"].map(ArchonId::from);
        assert!(DeliberationSession::new(SessionId::new(), PetitionId::new(), four).is_err());
    }

    #[test]
    fn test_session_rejects_duplicate_archon() {
        let dup = ["a", "b", "a"].map(ArchonId::from);
        let err = DeliberationSession::new(SessionId::new(), PetitionId::new(), dup).unwrap_err();
        assert!(matches!(err, CouncilError::DuplicateArchon { .. }));
    }

    #[test]
    fn test_cast_vote_by_unassigned_archon() {
        let mut s = session();
        let err = s
            .cast_vote(&ArchonId::from("mallory"), DispositionOutcome::Refer, "")
            .unwrap_err();
        assert!(matches!(err, CouncilError::UnauthorizedArchon { .. }));
    }

    #[test]
    fn test_cast_vote_twice() {
        let mut s = session();
        let a = ArchonId::from("alpha");
        s.cast_vote(&a, DispositionOutcome::Refer, "first").unwrap();
        let err = s.cast_vote(&a, DispositionOutcome::Escalate, "second").unwrap_err();
        assert!(matches!(err, CouncilError::DuplicateVote { .. }));
        assert_eq!(s.vote_of(&a), Some(DispositionOutcome::Refer));
        assert_eq!(s.rationale_of(&a), Some("first"));
    }

    #[test]
    fn test_missing_witness_phases() {
        let mut s = session();
        assert_eq!(s.missing_witness_phases().len(), 4);

        s.record_transcript(DeliberationPhase::Assessment, [1; 32]).unwrap();
        s.record_transcript(DeliberationPhase::CrossExamination, [3; 32]).unwrap();

        assert_eq!(
            s.missing_witness_phases(),
            vec![DeliberationPhase::Position, DeliberationPhase::Vote]
        );
        assert_eq!(s.phase(), DeliberationPhase::CrossExamination);
    }

    #[test]
    fn test_phase_never_moves_backwards() {
        let mut s = session();
        s.record_transcript(DeliberationPhase::Vote, [4; 32]).unwrap();
        s.record_transcript(DeliberationPhase::Assessment, [1; 32]).unwrap();
        assert_eq!(s.phase(), DeliberationPhase::Vote);
    }

    #[test]
    fn test_complete_phase_has_no_transcript() {
        let mut s = session();
        let err = s
            .record_transcript(DeliberationPhase::Complete, [0; 32])
            .unwrap_err();
        assert!(matches!(err, CouncilError::InvalidPhase { .. }));
    }

    #[test]
    fn test_outcome_from_str() {
        assert_eq!(
            "refer".parse::<DispositionOutcome>().unwrap(),
            DispositionOutcome::Refer
        );
        assert!("DEFER".parse::<DispositionOutcome>().is_err());
    }

    #[test]
    fn test_outcome_serializes_as_name() {
        let json = serde_json::to_string(&DispositionOutcome::Acknowledge).unwrap();
        assert_eq!(json, "\"ACKNOWLEDGE\"");
        let phase = serde_json::to_string(&DeliberationPhase::CrossExamination).unwrap();
        assert_eq!(phase, "\"CROSS_EXAMINATION\"");
    }
}
