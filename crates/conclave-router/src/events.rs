//! Completion and routing events.
//!
//! Both events are built once per emitted disposition and never mutated.
//! Their constructors re-validate what they carry so a malformed event
//! cannot reach the ledger even if the caller skipped a check.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use conclave_council::{ArchonId, DispositionOutcome, PetitionId, SessionId, ARCHONS_PER_SESSION};
use conclave_ledger::{hash_from_slice, hex_hash, GovernanceEvent, Hash};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RoutingError;
use crate::model::{PetitionPriority, PipelineType};
use crate::Result;

/// One archon's vote in the completion breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchonVote {
    pub outcome: DispositionOutcome,
    pub rationale: String,
}

/// Witness that a deliberation reached its disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliberationCompleteEvent {
    event_id: Uuid,
    session_id: SessionId,
    petition_id: PetitionId,
    outcome: DispositionOutcome,
    vote_breakdown: BTreeMap<ArchonId, ArchonVote>,
    dissent_present: bool,
    dissent_archon_id: Option<ArchonId>,
    dissent_disposition: Option<DispositionOutcome>,
    #[serde(with = "hex_hash")]
    vote_witness_hash: Hash,
    completed_at: DateTime<Utc>,
}

impl DeliberationCompleteEvent {
    /// Builds a completion event.
    ///
    /// # Arguments
    ///
    /// * `vote_breakdown` - Every archon's vote and rationale
    /// * `dissent_archon_id` - The dissenter on a 2-1 split, `None` if unanimous
    /// * `vote_witness_hash` - Transcript hash of the vote phase
    ///
    /// # Errors
    ///
    /// `RoutingError::InvalidEvent` when:
    /// - the witness hash is not exactly 32 bytes
    /// - the breakdown does not hold exactly three votes
    /// - fewer than two votes back `outcome`
    /// - the dissent field disagrees with the breakdown
    pub fn new(
        session_id: SessionId,
        petition_id: PetitionId,
        outcome: DispositionOutcome,
        vote_breakdown: BTreeMap<ArchonId, ArchonVote>,
        dissent_archon_id: Option<ArchonId>,
        vote_witness_hash: &[u8],
        completed_at: DateTime<Utc>,
    ) -> Result<Self> {
        let invalid = |detail: String| RoutingError::InvalidEvent { session_id, detail };

        let vote_witness_hash =
            hash_from_slice(vote_witness_hash).map_err(|e| invalid(format!("vote witness hash: {}", e)))?;

        if vote_breakdown.len() != ARCHONS_PER_SESSION {
            return Err(invalid(format!(
                "vote breakdown has {} entries, expected {}",
                vote_breakdown.len(),
                ARCHONS_PER_SESSION
            )));
        }

        let dissenters: Vec<&ArchonId> = vote_breakdown
            .iter()
            .filter(|(_, vote)| vote.outcome != outcome)
            .map(|(archon, _)| archon)
            .collect();
        if dissenters.len() > 1 {
            return Err(invalid(format!("outcome {} lacks a supermajority", outcome)));
        }

        let dissent_disposition = match (&dissent_archon_id, dissenters.first()) {
            (None, None) => None,
            (Some(named), Some(actual)) if named == *actual => {
                vote_breakdown.get(named).map(|vote| vote.outcome)
            }
            (named, actual) => {
                return Err(invalid(format!(
                    "dissent field {:?} disagrees with breakdown dissenter {:?}",
                    named, actual
                )))
            }
        };

        Ok(Self {
            event_id: Uuid::new_v4(),
            session_id,
            petition_id,
            outcome,
            vote_breakdown,
            dissent_present: dissent_archon_id.is_some(),
            dissent_archon_id,
            dissent_disposition,
            vote_witness_hash,
            completed_at,
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn petition_id(&self) -> PetitionId {
        self.petition_id
    }

    pub fn outcome(&self) -> DispositionOutcome {
        self.outcome
    }

    pub fn vote_breakdown(&self) -> &BTreeMap<ArchonId, ArchonVote> {
        &self.vote_breakdown
    }

    pub fn dissent_present(&self) -> bool {
        self.dissent_present
    }

    pub fn dissent_archon_id(&self) -> Option<&ArchonId> {
        self.dissent_archon_id.as_ref()
    }

    pub fn dissent_disposition(&self) -> Option<DispositionOutcome> {
        self.dissent_disposition
    }

    pub fn vote_witness_hash(&self) -> &Hash {
        &self.vote_witness_hash
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

impl GovernanceEvent for DeliberationCompleteEvent {
    const EVENT_TYPE: &'static str = "deliberation.completed";

    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// Witness that a petition entered a downstream pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRoutingEvent {
    pub event_id: Uuid,
    pub completion_event_id: Uuid,
    pub session_id: SessionId,
    pub petition_id: PetitionId,
    pub outcome: DispositionOutcome,
    pub pipeline: PipelineType,
    pub priority: PetitionPriority,
    pub routed_at: DateTime<Utc>,
}

impl PipelineRoutingEvent {
    pub fn for_completion(
        completion: &DeliberationCompleteEvent,
        pipeline: PipelineType,
        priority: PetitionPriority,
        routed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            completion_event_id: completion.event_id,
            session_id: completion.session_id,
            petition_id: completion.petition_id,
            outcome: completion.outcome,
            pipeline,
            priority,
            routed_at,
        }
    }
}

impl GovernanceEvent for PipelineRoutingEvent {
    const EVENT_TYPE: &'static str = "disposition.pipeline_routed";

    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.routed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_ledger::EventEnvelope;

    use DispositionOutcome::{Acknowledge, Escalate, Refer};

    fn breakdown(votes: [(&str, DispositionOutcome); 3]) -> BTreeMap<ArchonId, ArchonVote> {
        votes
            .into_iter()
            .map(|(a, outcome)| {
                (
                    ArchonId::from(a),
                    ArchonVote {
                        outcome,
                        rationale: format!("{} rationale", a),
                    },
                )
            })
            .collect()
    }

    fn build(
        votes: [(&str, DispositionOutcome); 3],
        outcome: DispositionOutcome,
        dissent: Option<&str>,
        hash: &[u8],
    ) -> Result<DeliberationCompleteEvent> {
        DeliberationCompleteEvent::new(
            SessionId::new(),
            PetitionId::new(),
            outcome,
            breakdown(votes),
            dissent.map(ArchonId::from),
            hash,
            Utc::now(),
        )
    }

    #[test]
    fn test_split_event_carries_dissent() {
        let event = build(
            [("A", Acknowledge), ("B", Acknowledge), ("C", Refer)],
            Acknowledge,
            Some("C"),
            &[1; 32],
        )
        .unwrap();
        assert!(event.dissent_present());
        assert_eq!(event.dissent_archon_id(), Some(&ArchonId::from("C")));
        assert_eq!(event.dissent_disposition(), Some(Refer));
    }

    #[test]
    fn test_unanimous_event_has_no_dissent() {
        let event = build([("A", Refer), ("B", Refer), ("C", Refer)], Refer, None, &[1; 32]).unwrap();
        assert!(!event.dissent_present());
        assert!(event.dissent_disposition().is_none());
    }

    #[test]
    fn test_rejects_short_witness_hash() {
        let err = build([("A", Refer), ("B", Refer), ("C", Refer)], Refer, None, &[1; 31]).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidEvent { .. }));
    }

    #[test]
    fn test_rejects_inconsistent_dissent() {
        // Named dissenter voted with the majority
        assert!(build(
            [("A", Acknowledge), ("B", Acknowledge), ("C", Refer)],
            Acknowledge,
            Some("B"),
            &[1; 32]
        )
        .is_err());
        // Split without a named dissenter
        assert!(build(
            [("A", Acknowledge), ("B", Acknowledge), ("C", Refer)],
            Acknowledge,
            None,
            &[1; 32]
        )
        .is_err());
        // Unanimous with a named dissenter
        assert!(build([("A", Refer), ("B", Refer), ("C", Refer)], Refer, Some("A"), &[1; 32]).is_err());
    }

    #[test]
    fn test_rejects_outcome_without_supermajority() {
        let err = build(
            [("A", Acknowledge), ("B", Escalate), ("C", Refer)],
            Acknowledge,
            Some("C"),
            &[1; 32],
        )
        .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidEvent { .. }));
    }

    #[test]
    fn test_envelope_payload_uses_names_and_strings() {
        let event = build(
            [("A", Acknowledge), ("B", Acknowledge), ("C", Refer)],
            Acknowledge,
            Some("C"),
            &[0xcd; 32],
        )
        .unwrap();
        let envelope = EventEnvelope::wrap(&event).unwrap();

        assert_eq!(envelope.event_type, "deliberation.completed");
        assert_eq!(envelope.payload["outcome"], "ACKNOWLEDGE");
        assert_eq!(envelope.payload["session_id"], event.session_id().to_string());
        assert_eq!(envelope.payload["vote_witness_hash"], "cd".repeat(32));
        assert_eq!(envelope.payload["vote_breakdown"]["C"]["outcome"], "REFER");
    }
}
