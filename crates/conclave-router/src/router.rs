//! Idempotent disposition emission.
//!
//! `emit_disposition` is the terminal step of a deliberation:
//!
//! 1. Return the cached result if the session was already emitted
//! 2. Require a transcript hash for all four witnessed phases
//! 3. Require the petition to be `DELIBERATING`
//! 4. Map the winning outcome to a pipeline
//! 5. Build the completion and routing events
//! 6. Enqueue the petition and cache the result
//!
//! Calls for the same session serialize on a per-session lock, so retries
//! and concurrent duplicates observe the first call's result and never
//! enqueue twice. Calls for different sessions do not contend.
//!
//! Steps 2 to 4 and the one-session-per-petition check are also exposed
//! as [`DispositionRouter::precheck`], which writes nothing. A caller with its own side effects runs it first so a
//! refused emission leaves no trace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use conclave_council::{
    ConsensusResult, DeliberationPhase, DeliberationSession, DispositionOutcome, PetitionId, SessionId,
};
use conclave_ledger::{KeyedLocks, TimeAuthority};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RoutingError;
use crate::events::{ArchonVote, DeliberationCompleteEvent, PipelineRoutingEvent};
use crate::model::{Petition, PetitionState, PipelineType, RoutingTable};
use crate::queue::{PendingDisposition, PipelineQueues};
use crate::Result;

/// Everything produced by one emitted disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispositionResult {
    pub completion_event: DeliberationCompleteEvent,
    pub routing_event: PipelineRoutingEvent,
    pub pipeline: PipelineType,
    pub pending: PendingDisposition,
    /// State the petition store should record.
    pub petition_state: PetitionState,
}

/// Disposition routing port.
pub trait DispositionEmitter: Send + Sync {
    /// Routes a completed deliberation to its pipeline.
    ///
    /// # Errors
    ///
    /// - `RoutingError::IncompleteWitnessChain` naming every missing phase
    /// - `RoutingError::InvalidPetitionState` unless the petition is deliberating
    /// - `RoutingError::UnmappedOutcome` if no pipeline takes the outcome
    /// - `RoutingError::ConsensusNotResolved`, `SessionMismatch`,
    ///   `PetitionMismatch`, `InvalidEvent`, `PetitionAlreadyRouted`
    fn emit_disposition(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        petition: &Petition,
    ) -> Result<DispositionResult>;

    /// Up to `limit` pending entries in service order.
    fn get_pending_dispositions(&self, pipeline: PipelineType, limit: usize) -> Vec<PendingDisposition>;

    /// Removes one pending entry. Returns whether anything was found.
    fn acknowledge_routing(&self, petition_id: PetitionId, pipeline: PipelineType) -> bool;
}

/// In-process disposition router.
///
/// ## Idempotency Window
///
/// Emitted results and petition reservations live as long as the router.
/// Acknowledgment removes only the queue entry: a retry for an
/// acknowledged session still returns the cached result, and its petition
/// stays reserved against other sessions. Memory therefore grows with the
/// number of sessions routed by one process. Across a restart the window
/// resets and the ledger is the record of what was routed.
pub struct DispositionRouter {
    routing: RoutingTable,
    clock: Arc<dyn TimeAuthority>,
    locks: KeyedLocks<SessionId>,
    emitted: RwLock<HashMap<SessionId, DispositionResult>>,
    routed_petitions: Mutex<HashMap<PetitionId, SessionId>>,
    queues: PipelineQueues,
    sequence: AtomicU64,
}

impl DispositionRouter {
    /// Creates a router with the default routing table.
    pub fn new(clock: Arc<dyn TimeAuthority>) -> Self {
        Self {
            routing: RoutingTable::default(),
            clock,
            locks: KeyedLocks::new(),
            emitted: RwLock::new(HashMap::new()),
            routed_petitions: Mutex::new(HashMap::new()),
            queues: PipelineQueues::new(),
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_routing_table(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing
    }

    /// Returns true once `session_id` has been emitted.
    pub fn is_emitted(&self, session_id: SessionId) -> bool {
        self.cached(session_id).is_some()
    }

    /// The cached result for an emitted session.
    pub fn emitted_result(&self, session_id: SessionId) -> Option<DispositionResult> {
        self.cached(session_id)
    }

    pub fn pending_count(&self, pipeline: PipelineType) -> usize {
        self.queues.len(pipeline)
    }

    fn cached(&self, session_id: SessionId) -> Option<DispositionResult> {
        self.emitted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .cloned()
    }

    /// Runs every check `emit_disposition` makes without enqueuing,
    /// reserving or caching anything.
    ///
    /// Returns the pipeline the session would be routed to, or the cached
    /// pipeline once the session has been emitted.
    ///
    /// # Errors
    ///
    /// The same errors as [`DispositionEmitter::emit_disposition`].
    pub fn precheck(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        petition: &Petition,
    ) -> Result<PipelineType> {
        if let Some(cached) = self.cached(session.session_id()) {
            return Ok(cached.pipeline);
        }
        self.validate(session, consensus, petition).map(|(_, pipeline)| pipeline)
    }

    fn validate(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        petition: &Petition,
    ) -> Result<(DispositionOutcome, PipelineType)> {
        let session_id = session.session_id();
        let missing_phases = session.missing_witness_phases();
        if !missing_phases.is_empty() {
            warn!(
                "Session {} has incomplete witness chain ({} phases missing)",
                session_id,
                missing_phases.len()
            );
            return Err(RoutingError::IncompleteWitnessChain {
                session_id,
                petition_id: session.petition_id(),
                missing_phases,
            });
        }

        if consensus.session_id() != session_id {
            return Err(RoutingError::SessionMismatch {
                expected: session_id,
                actual: consensus.session_id(),
            });
        }
        if petition.petition_id != session.petition_id() {
            return Err(RoutingError::PetitionMismatch {
                session_id,
                expected: session.petition_id(),
                actual: petition.petition_id,
            });
        }

        if petition.state != PetitionState::Deliberating {
            return Err(RoutingError::InvalidPetitionState {
                petition_id: petition.petition_id,
                actual: petition.state,
                expected: PetitionState::Deliberating,
            });
        }

        let outcome = consensus
            .winning_outcome()
            .ok_or(RoutingError::ConsensusNotResolved {
                session_id,
                status: consensus.status(),
            })?;
        let pipeline = self.routing.route(outcome).ok_or(RoutingError::UnmappedOutcome {
            session_id,
            petition_id: petition.petition_id,
            outcome,
        })?;

        let routed_by = self
            .routed_petitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&petition.petition_id)
            .copied();
        match routed_by {
            Some(existing) if existing != session_id => Err(RoutingError::PetitionAlreadyRouted {
                petition_id: petition.petition_id,
                session_id: existing,
            }),
            _ => Ok((outcome, pipeline)),
        }
    }

    fn emit_locked(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        petition: &Petition,
    ) -> Result<DispositionResult> {
        let session_id = session.session_id();
        if let Some(cached) = self.cached(session_id) {
            debug!("Session {} already emitted; returning cached result", session_id);
            return Ok(cached);
        }
        let (outcome, pipeline) = self.validate(session, consensus, petition)?;

        let breakdown = session
            .votes()
            .iter()
            .map(|(archon, vote)| {
                (
                    archon.clone(),
                    ArchonVote {
                        outcome: vote.outcome,
                        rationale: vote.rationale.clone(),
                    },
                )
            })
            .collect();
        let witness = session
            .transcript(DeliberationPhase::Vote)
            .ok_or_else(|| RoutingError::IncompleteWitnessChain {
                session_id,
                petition_id: petition.petition_id,
                missing_phases: vec![DeliberationPhase::Vote],
            })?;

        let completion = DeliberationCompleteEvent::new(
            session_id,
            petition.petition_id,
            outcome,
            breakdown,
            consensus.dissent_archon_id().cloned(),
            witness.as_slice(),
            consensus.resolved_at(),
        )?;
        let routed_at = self.clock.now();
        let routing_event = PipelineRoutingEvent::for_completion(&completion, pipeline, petition.priority, routed_at);

        {
            let mut routed = self.routed_petitions.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = routed.get(&petition.petition_id) {
                return Err(RoutingError::PetitionAlreadyRouted {
                    petition_id: petition.petition_id,
                    session_id: *existing,
                });
            }
            routed.insert(petition.petition_id, session_id);
        }

        let pending = PendingDisposition {
            petition_id: petition.petition_id,
            session_id,
            pipeline,
            outcome,
            priority: petition.priority,
            routing_event_id: routing_event.event_id,
            enqueued_at: routed_at,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        self.queues.push(pending.clone());

        let result = DispositionResult {
            completion_event: completion,
            routing_event,
            pipeline,
            pending,
            petition_state: PetitionState::Routed,
        };
        self.emitted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id, result.clone());

        info!(
            "Routed petition {} from session {} to {} ({})",
            petition.petition_id, session_id, pipeline, outcome
        );
        Ok(result)
    }
}

impl DispositionEmitter for DispositionRouter {
    fn emit_disposition(
        &self,
        session: &DeliberationSession,
        consensus: &ConsensusResult,
        petition: &Petition,
    ) -> Result<DispositionResult> {
        self.locks
            .with_lock(&session.session_id(), || self.emit_locked(session, consensus, petition))
    }

    fn get_pending_dispositions(&self, pipeline: PipelineType, limit: usize) -> Vec<PendingDisposition> {
        self.queues.peek(pipeline, limit)
    }

    fn acknowledge_routing(&self, petition_id: PetitionId, pipeline: PipelineType) -> bool {
        let found = self.queues.remove(pipeline, petition_id);
        if found {
            info!("Pipeline {} acknowledged petition {}", pipeline, petition_id);
        } else {
            debug!("No pending entry for petition {} in {}", petition_id, pipeline);
        }
        found
    }
}
