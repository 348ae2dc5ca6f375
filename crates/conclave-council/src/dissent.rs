//! Dissent recording with tamper-evident rationale hashes.
//!
//! On a 2-1 split the minority archon's vote and rationale are preserved.
//! The rationale is hashed with BLAKE3 at record time; the ledger receives
//! only the hash, so the witness event stays small and the full text can
//! later be checked against it.
//!
//! ## Attribution
//!
//! The dissenting outcome is taken from the session's recorded vote. When
//! that vote is unavailable it is inferred from the vote distribution, but
//! only if exactly one non-winning outcome received a single vote. Anything
//! else is rejected as ambiguous rather than guessed.
//!
//! ## Retry
//!
//! The witness event is appended before the record is stored. A record
//! whose event reached the ledger but whose store write failed is held
//! until a retry stores it; the retry does not append a second event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use conclave_ledger::{
    content_hash, hash_from_slice, hex_hash, record_event, GovernanceEvent, GovernanceLedger, Hash,
    KeyedLocks, TimeAuthority,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consensus::{ConsensusResult, ConsensusStatus};
use crate::error::CouncilError;
use crate::model::{ArchonId, DeliberationSession, DispositionOutcome, PetitionId, SessionId};
use crate::store::DissentStore;
use crate::Result;

/// Minority opinion from a 2-1 deliberation.
///
/// The rationale hash is always computed from the rationale text by this
/// type; it cannot be supplied independently except through [`restore`],
/// which verifies it.
///
/// [`restore`]: DissentRecord::restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DissentRecord {
    dissent_id: Uuid,
    session_id: SessionId,
    petition_id: PetitionId,
    dissent_archon_id: ArchonId,
    dissent_disposition: DispositionOutcome,
    rationale_text: String,
    #[serde(with = "hex_hash")]
    rationale_hash: Hash,
    majority_disposition: DispositionOutcome,
    recorded_at: DateTime<Utc>,
}

impl DissentRecord {
    /// Creates a record, hashing `rationale` with BLAKE3.
    ///
    /// # Errors
    ///
    /// `CouncilError::DissentMatchesMajority` if the dissent and majority
    /// dispositions are equal.
    pub fn new(
        session_id: SessionId,
        petition_id: PetitionId,
        dissent_archon_id: ArchonId,
        dissent_disposition: DispositionOutcome,
        majority_disposition: DispositionOutcome,
        rationale: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        Self::build(
            Uuid::new_v4(),
            session_id,
            petition_id,
            dissent_archon_id,
            dissent_disposition,
            majority_disposition,
            rationale.into(),
            recorded_at,
        )
    }

    /// Rebuilds a persisted record, checking the stored hash.
    ///
    /// # Errors
    ///
    /// - `CouncilError::InvalidRationaleHash` if `rationale_hash` is not 32
    ///   bytes or does not match the rationale text
    /// - `CouncilError::DissentMatchesMajority` as for [`DissentRecord::new`]
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        dissent_id: Uuid,
        session_id: SessionId,
        petition_id: PetitionId,
        dissent_archon_id: ArchonId,
        dissent_disposition: DispositionOutcome,
        majority_disposition: DispositionOutcome,
        rationale_text: String,
        rationale_hash: &[u8],
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        let stored = hash_from_slice(rationale_hash).map_err(|e| CouncilError::InvalidRationaleHash {
            session_id,
            detail: e.to_string(),
        })?;
        let record = Self::build(
            dissent_id,
            session_id,
            petition_id,
            dissent_archon_id,
            dissent_disposition,
            majority_disposition,
            rationale_text,
            recorded_at,
        )?;
        if record.rationale_hash != stored {
            return Err(CouncilError::InvalidRationaleHash {
                session_id,
                detail: "hash does not match rationale".to_string(),
            });
        }
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        dissent_id: Uuid,
        session_id: SessionId,
        petition_id: PetitionId,
        dissent_archon_id: ArchonId,
        dissent_disposition: DispositionOutcome,
        majority_disposition: DispositionOutcome,
        rationale_text: String,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        if dissent_disposition == majority_disposition {
            return Err(CouncilError::DissentMatchesMajority {
                session_id,
                archon_id: dissent_archon_id,
                outcome: dissent_disposition,
            });
        }
        let rationale_hash = content_hash(&rationale_text);
        Ok(Self {
            dissent_id,
            session_id,
            petition_id,
            dissent_archon_id,
            dissent_disposition,
            rationale_text,
            rationale_hash,
            majority_disposition,
            recorded_at,
        })
    }

    pub fn dissent_id(&self) -> Uuid {
        self.dissent_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn petition_id(&self) -> PetitionId {
        self.petition_id
    }

    pub fn dissent_archon_id(&self) -> &ArchonId {
        &self.dissent_archon_id
    }

    pub fn dissent_disposition(&self) -> DispositionOutcome {
        self.dissent_disposition
    }

    pub fn majority_disposition(&self) -> DispositionOutcome {
        self.majority_disposition
    }

    pub fn rationale_text(&self) -> &str {
        &self.rationale_text
    }

    pub fn rationale_hash(&self) -> &Hash {
        &self.rationale_hash
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Returns true iff `text` hashes to the stored rationale hash.
    pub fn verify_rationale_integrity(&self, text: &str) -> bool {
        content_hash(text) == self.rationale_hash
    }

    /// Returns true iff the record's own rationale still matches its hash.
    pub fn is_intact(&self) -> bool {
        self.verify_rationale_integrity(&self.rationale_text)
    }
}

/// Ledger witness for a recorded dissent. Carries the hash, never the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DissentRecordedEvent {
    pub event_id: Uuid,
    pub dissent_id: Uuid,
    pub session_id: SessionId,
    pub petition_id: PetitionId,
    pub dissent_archon_id: ArchonId,
    pub dissent_disposition: DispositionOutcome,
    pub majority_disposition: DispositionOutcome,
    #[serde(with = "hex_hash")]
    pub rationale_hash: Hash,
    pub recorded_at: DateTime<Utc>,
}

impl DissentRecordedEvent {
    pub fn from_record(record: &DissentRecord) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            dissent_id: record.dissent_id,
            session_id: record.session_id,
            petition_id: record.petition_id,
            dissent_archon_id: record.dissent_archon_id.clone(),
            dissent_disposition: record.dissent_disposition,
            majority_disposition: record.majority_disposition,
            rationale_hash: record.rationale_hash,
            recorded_at: record.recorded_at,
        }
    }
}

impl GovernanceEvent for DissentRecordedEvent {
    const EVENT_TYPE: &'static str = "deliberation.dissent_recorded";

    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Dissent recording port.
pub trait DissentRecorder: Send + Sync {
    /// Records the minority opinion of a resolved deliberation.
    ///
    /// Returns `Ok(None)` for a unanimous result. Recording the same
    /// session again returns the stored record without a second event.
    ///
    /// # Errors
    ///
    /// - `CouncilError::SessionMismatch` if `consensus` is for another session
    /// - `CouncilError::ConsensusNotResolved` for `NotReached`/`Invalid`
    /// - `CouncilError::AmbiguousDissent` if the dissent cannot be attributed
    /// - `CouncilError::Ledger` if the witness event cannot be appended
    fn record_dissent(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        rationale: &str,
    ) -> Result<Option<DissentRecord>>;

    fn dissent_for_session(&self, session_id: SessionId) -> Result<Option<DissentRecord>>;

    fn dissents_for_petition(&self, petition_id: PetitionId) -> Result<Vec<DissentRecord>>;

    fn dissents_by_archon(&self, archon_id: &ArchonId) -> Result<Vec<DissentRecord>>;

    /// Re-hashes the stored rationale for `session_id`.
    ///
    /// Returns `None` when no dissent is stored for the session.
    fn verify_stored_integrity(&self, session_id: SessionId) -> Result<Option<bool>>;
}

/// Dissent recorder backed by a [`DissentStore`] and the governance ledger.
pub struct ArchonDissentRecorder {
    store: Arc<dyn DissentStore>,
    ledger: Arc<dyn GovernanceLedger>,
    clock: Arc<dyn TimeAuthority>,
    locks: KeyedLocks<SessionId>,
    /// Records witnessed on the ledger but not yet stored.
    witnessed: Mutex<HashMap<SessionId, DissentRecord>>,
}

impl ArchonDissentRecorder {
    pub fn new(
        store: Arc<dyn DissentStore>,
        ledger: Arc<dyn GovernanceLedger>,
        clock: Arc<dyn TimeAuthority>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            locks: KeyedLocks::new(),
            witnessed: Mutex::new(HashMap::new()),
        }
    }

    fn witnessed(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, DissentRecord>> {
        self.witnessed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dissent_outcome(
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        archon_id: &ArchonId,
        majority: DispositionOutcome,
    ) -> Result<DispositionOutcome> {
        if let Some(outcome) = session.vote_of(archon_id) {
            return Ok(outcome);
        }

        let candidates: Vec<DispositionOutcome> = consensus
            .vote_distribution()
            .iter()
            .filter(|(outcome, count)| **outcome != majority && **count == 1)
            .map(|(outcome, _)| *outcome)
            .collect();

        match candidates.as_slice() {
            [only] => {
                debug!(
                    "Inferred dissent of '{}' in session {} from distribution",
                    archon_id,
                    session.session_id()
                );
                Ok(*only)
            }
            _ => Err(CouncilError::AmbiguousDissent {
                session_id: session.session_id(),
                archon_id: archon_id.clone(),
                candidates,
            }),
        }
    }

    fn record_locked(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        rationale: &str,
    ) -> Result<Option<DissentRecord>> {
        let session_id = session.session_id();
        if let Some(existing) = self.store.by_session(session_id)? {
            debug!("Dissent for session {} already recorded", session_id);
            return Ok(Some(existing));
        }

        let pending = self.witnessed().get(&session_id).cloned();
        let record = match pending {
            Some(record) => {
                debug!(
                    "Dissent {} for session {} already witnessed, retrying store",
                    record.dissent_id(),
                    session_id
                );
                record
            }
            None => self.witness(session, consensus, rationale)?,
        };

        self.store.save(record.clone())?;
        self.witnessed().remove(&session_id);
        Ok(Some(record))
    }

    fn witness(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        rationale: &str,
    ) -> Result<DissentRecord> {
        let session_id = session.session_id();
        let not_resolved = || CouncilError::ConsensusNotResolved {
            session_id,
            status: consensus.status(),
        };
        let majority = consensus.winning_outcome().ok_or_else(not_resolved)?;
        let archon_id = consensus.dissent_archon_id().ok_or_else(not_resolved)?;
        let dissent = Self::dissent_outcome(session, consensus, archon_id, majority)?;

        let record = DissentRecord::new(
            session_id,
            session.petition_id(),
            archon_id.clone(),
            dissent,
            majority,
            rationale,
            self.clock.now(),
        )?;

        let sequence = record_event(self.ledger.as_ref(), &DissentRecordedEvent::from_record(&record))?;
        self.witnessed().insert(session_id, record.clone());

        info!(
            "Recorded dissent {} by '{}' in session {} ({} vs {}, ledger seq {})",
            record.dissent_id(),
            archon_id,
            session_id,
            dissent,
            majority,
            sequence
        );
        Ok(record)
    }
}

impl DissentRecorder for ArchonDissentRecorder {
    fn record_dissent(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        rationale: &str,
    ) -> Result<Option<DissentRecord>> {
        if consensus.session_id() != session.session_id() {
            return Err(CouncilError::SessionMismatch {
                expected: session.session_id(),
                actual: consensus.session_id(),
            });
        }

        match consensus.status() {
            ConsensusStatus::Unanimous => Ok(None),
            ConsensusStatus::Achieved => self
                .locks
                .with_lock(&session.session_id(), || self.record_locked(session, consensus, rationale)),
            status => {
                warn!(
                    "Refusing to record dissent for unresolved session {} ({:?})",
                    session.session_id(),
                    status
                );
                Err(CouncilError::ConsensusNotResolved {
                    session_id: session.session_id(),
                    status,
                })
            }
        }
    }

    fn dissent_for_session(&self, session_id: SessionId) -> Result<Option<DissentRecord>> {
        self.store.by_session(session_id)
    }

    fn dissents_for_petition(&self, petition_id: PetitionId) -> Result<Vec<DissentRecord>> {
        self.store.by_petition(petition_id)
    }

    fn dissents_by_archon(&self, archon_id: &ArchonId) -> Result<Vec<DissentRecord>> {
        self.store.by_archon(archon_id)
    }

    fn verify_stored_integrity(&self, session_id: SessionId) -> Result<Option<bool>> {
        let record = self.store.by_session(session_id)?;
        if let Some(r) = &record {
            if !r.is_intact() {
                warn!("Stored dissent for session {} failed integrity check", session_id);
            }
        }
        Ok(record.map(|r| r.is_intact()))
    }
}
