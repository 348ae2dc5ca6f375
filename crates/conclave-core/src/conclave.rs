//! The unified Conclave facade.
//!
//! This module provides the main entry point for the deliberation core.
//! The [`Conclave`] struct wires the consensus engine, dissent recorder,
//! coercion filter and disposition router to one clock and one governance
//! ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use conclave_council::{
    ArchonDissentRecorder, ConsensusEngine, ConsensusResolver, ConsensusResult, DeliberationSession,
    DissentRecord, DissentRecorder, InMemoryDissentStore, SessionId,
};
use conclave_filter::{
    CoercionFilter, CoercionFilterPipeline, DecisionLogStore, FilterPreview, FilterResult,
    InMemoryDecisionLogStore, MessageKind, MessageSender, PatternLibrary, StaticPatternLibrary,
};
use conclave_ledger::{
    record_event, GovernanceLedger, InMemoryLedger, KeyedLocks, SledLedger, SystemTimeAuthority, TimeAuthority,
};
use conclave_router::{DispositionEmitter, DispositionResult, DispositionRouter, Petition};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ConclaveConfig;
use crate::Result;

/// Everything produced by completing one deliberation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliberationOutcome {
    pub consensus: ConsensusResult,
    /// Present only for a 2-1 split.
    pub dissent: Option<DissentRecord>,
    pub disposition: DispositionResult,
    /// Ledger sequence of the completion event.
    pub completion_sequence: u64,
    /// Ledger sequence of the routing event.
    pub routing_sequence: u64,
}

/// The unified deliberation governance facade.
///
/// Conclave orchestrates four components:
/// - **Consensus Engine**: resolves the three archon votes by supermajority
/// - **Dissent Recorder**: preserves the minority rationale of a 2-1 split
/// - **Coercion Filter**: gates every participant-facing message
/// - **Disposition Router**: routes the outcome to its downstream pipeline
///
/// # Completion Pipeline
///
/// 1. Resolve consensus from the session's votes
/// 2. Check the witness chain, petition state and routing table
/// 3. Record dissent (2-1 splits only)
/// 4. Emit the disposition
/// 5. Append the completion and routing events to the ledger
///
/// Nothing is written before step 3, so a refused deliberation leaves the
/// ledger and the dissent store untouched. Steps run under a per-session
/// lock. A session that completed once returns the same
/// [`DeliberationOutcome`] on every later call, and a retry after a failed
/// append skips the events already on the ledger.
///
/// # Example
///
/// ```rust,ignore
/// let conclave = Conclave::new(ConclaveConfig::default())?;
///
/// let outcome = conclave.complete_deliberation(&session, &petition)?;
/// session.complete(&outcome.consensus)?;
///
/// let result = conclave.filter_message(text, MessageKind::Reminder, "scheduler")?;
/// if let Some(content) = result.content() {
///     sender.send(recipient, content)?;
/// }
/// ```
pub struct Conclave {
    config: ConclaveConfig,
    clock: Arc<dyn TimeAuthority>,
    ledger: Arc<dyn GovernanceLedger>,
    consensus: ConsensusEngine,
    dissent_store: Arc<InMemoryDissentStore>,
    dissent: ArchonDissentRecorder,
    decision_log: Arc<InMemoryDecisionLogStore>,
    library: Arc<dyn PatternLibrary>,
    filter: CoercionFilterPipeline,
    router: DispositionRouter,
    locks: KeyedLocks<SessionId>,
    completed: RwLock<HashMap<SessionId, DeliberationOutcome>>,
    /// Completion events on the ledger whose routing event is not.
    completions_appended: Mutex<HashMap<SessionId, u64>>,
}

impl Conclave {
    /// Create a new Conclave using the system clock.
    ///
    /// The ledger is sled-backed when `config.ledger.db_path` is set,
    /// in-memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The ledger database cannot be opened
    /// - The default pattern library fails to build
    pub fn new(config: ConclaveConfig) -> Result<Self> {
        let ledger: Arc<dyn GovernanceLedger> = match &config.ledger.db_path {
            Some(path) => Arc::new(SledLedger::open(path)?),
            None => Arc::new(InMemoryLedger::new()),
        };
        Self::with_components(config, Arc::new(SystemTimeAuthority), ledger)
    }

    /// Create a Conclave over an injected clock and ledger.
    ///
    /// `config.ledger` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the default
    /// pattern library fails to build.
    pub fn with_components(
        config: ConclaveConfig,
        clock: Arc<dyn TimeAuthority>,
        ledger: Arc<dyn GovernanceLedger>,
    ) -> Result<Self> {
        config.validate()?;

        let consensus = ConsensusEngine::new(clock.clone())
            .with_permitted_outcomes(config.consensus.permitted_outcomes.iter().copied());
        let dissent_store = Arc::new(InMemoryDissentStore::new());
        let dissent = ArchonDissentRecorder::new(dissent_store.clone(), ledger.clone(), clock.clone());
        let decision_log = Arc::new(InMemoryDecisionLogStore::new());
        let library: Arc<dyn PatternLibrary> = Arc::new(StaticPatternLibrary::with_defaults()?);
        let filter = Self::build_filter(&config, library.clone(), &clock, &decision_log, &ledger);
        let router = DispositionRouter::new(clock.clone()).with_routing_table(config.router.routing.clone());

        info!(
            "Conclave initialized with filter {} ({} ms budget)",
            config.filter.filter_version, config.filter.processing_budget_ms
        );

        Ok(Self {
            config,
            clock,
            ledger,
            consensus,
            dissent_store,
            dissent,
            decision_log,
            library,
            filter,
            router,
            locks: KeyedLocks::new(),
            completed: RwLock::new(HashMap::new()),
            completions_appended: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the default coercion pattern library.
    #[must_use]
    pub fn with_pattern_library(mut self, library: Arc<dyn PatternLibrary>) -> Self {
        self.filter = Self::build_filter(&self.config, library.clone(), &self.clock, &self.decision_log, &self.ledger);
        self.library = library;
        self
    }

    fn build_filter(
        config: &ConclaveConfig,
        library: Arc<dyn PatternLibrary>,
        clock: &Arc<dyn TimeAuthority>,
        decision_log: &Arc<InMemoryDecisionLogStore>,
        ledger: &Arc<dyn GovernanceLedger>,
    ) -> CoercionFilterPipeline {
        let store: Arc<dyn DecisionLogStore> = decision_log.clone();
        CoercionFilterPipeline::new(library, clock.clone(), store, ledger.clone())
            .with_filter_version(config.filter.filter_version.clone())
            .with_processing_budget(config.filter.processing_budget())
    }

    pub fn config(&self) -> &ConclaveConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn GovernanceLedger> {
        &self.ledger
    }

    pub fn consensus_engine(&self) -> &ConsensusEngine {
        &self.consensus
    }

    pub fn dissent_recorder(&self) -> &ArchonDissentRecorder {
        &self.dissent
    }

    /// Number of dissent records held.
    pub fn dissent_count(&self) -> usize {
        self.dissent_store.len()
    }

    pub fn decision_log(&self) -> &InMemoryDecisionLogStore {
        &self.decision_log
    }

    pub fn pattern_library(&self) -> &Arc<dyn PatternLibrary> {
        &self.library
    }

    pub fn router(&self) -> &DispositionRouter {
        &self.router
    }

    /// Flush the governance ledger to durable storage.
    ///
    /// # Errors
    ///
    /// Returns `ConclaveError::Ledger` if the backing store cannot flush.
    pub fn flush(&self) -> Result<()> {
        self.ledger.flush()?;
        Ok(())
    }

    /// Complete a voted deliberation.
    ///
    /// Runs the completion pipeline described on [`Conclave`]. Retries and
    /// concurrent calls for the same session return the first successful
    /// outcome and append nothing further to the ledger.
    ///
    /// # Arguments
    ///
    /// * `session` - The session, with all three votes cast
    /// * `petition` - The petition under deliberation
    ///
    /// # Errors
    ///
    /// - `ConclaveError::Council` for invalid votes, a three-way split or a
    ///   dissent that cannot be attributed
    /// - `ConclaveError::Routing` for an incomplete witness chain, a petition
    ///   not in `DELIBERATING`, or an unmapped outcome
    /// - `ConclaveError::Ledger` if an event cannot be appended; a retry
    ///   appends only what is still missing
    pub fn complete_deliberation(
        &self,
        session: &DeliberationSession,
        petition: &Petition,
    ) -> Result<DeliberationOutcome> {
        self.locks
            .with_lock(&session.session_id(), || self.complete_locked(session, petition))
    }

    /// The stored outcome of a completed session.
    pub fn completed_outcome(&self, session_id: SessionId) -> Option<DeliberationOutcome> {
        self.completed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .cloned()
    }

    fn complete_locked(&self, session: &DeliberationSession, petition: &Petition) -> Result<DeliberationOutcome> {
        let session_id = session.session_id();
        if let Some(outcome) = self.completed_outcome(session_id) {
            debug!("Session {} already completed; returning stored outcome", session_id);
            return Ok(outcome);
        }

        let consensus = self.consensus.resolve_consensus(session, &session.vote_map())?;
        self.router.precheck(session, &consensus, petition)?;

        let dissent = match consensus.dissent_archon_id() {
            Some(archon) => {
                let rationale = session.rationale_of(archon).unwrap_or_default();
                self.dissent.record_dissent(session, &consensus, rationale)?
            }
            None => None,
        };

        let disposition = self.router.emit_disposition(session, &consensus, petition)?;

        let completion_sequence = self.append_completion(session_id, &disposition)?;
        let routing_sequence = record_event(self.ledger.as_ref(), &disposition.routing_event)?;
        self.completions_appended().remove(&session_id);

        let outcome = DeliberationOutcome {
            consensus,
            dissent,
            disposition,
            completion_sequence,
            routing_sequence,
        };
        self.completed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id, outcome.clone());

        info!(
            "Completed session {} for petition {}: {} -> {} (ledger seq {}, {})",
            session_id,
            petition.petition_id,
            outcome.disposition.completion_event.outcome(),
            outcome.disposition.pipeline,
            completion_sequence,
            routing_sequence
        );
        Ok(outcome)
    }

    fn completions_appended(&self) -> MutexGuard<'_, HashMap<SessionId, u64>> {
        self.completions_appended.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_completion(&self, session_id: SessionId, disposition: &DispositionResult) -> Result<u64> {
        if let Some(sequence) = self.completions_appended().get(&session_id).copied() {
            debug!("Completion for session {} already at ledger seq {}", session_id, sequence);
            return Ok(sequence);
        }
        let sequence = record_event(self.ledger.as_ref(), &disposition.completion_event)?;
        self.completions_appended().insert(session_id, sequence);
        Ok(sequence)
    }

    /// Filter a participant-facing message and record the decision.
    ///
    /// # Errors
    ///
    /// Returns an error only if the decision could not be recorded. A
    /// rejected or blocked message is an `Ok` result.
    pub fn filter_message(&self, text: &str, kind: MessageKind, submitter_id: &str) -> Result<FilterResult> {
        Ok(self.filter.filter(text, kind, submitter_id)?)
    }

    /// Run the filter without recording anything.
    pub fn preview_message(&self, text: &str, kind: MessageKind) -> FilterPreview {
        self.filter.preview(text, kind)
    }

    /// Filter a message and deliver it if accepted.
    ///
    /// Nothing is sent unless the filter accepts the text; the returned
    /// result tells the caller which way it went.
    ///
    /// # Errors
    ///
    /// - `ConclaveError::Filter` if the decision could not be recorded
    /// - `ConclaveError::Delivery` if the sender refuses accepted content
    pub fn send_filtered(
        &self,
        sender: &dyn MessageSender,
        recipient: &str,
        text: &str,
        kind: MessageKind,
        submitter_id: &str,
    ) -> Result<FilterResult> {
        let result = self.filter_message(text, kind, submitter_id)?;
        match result.content() {
            Some(content) => {
                sender.send(recipient, content)?;
                debug!("Delivered filtered {:?} message to {}", kind, recipient);
            }
            None => warn!(
                "Withheld {:?} message to {} from {}: {}",
                kind,
                recipient,
                submitter_id,
                result.decision()
            ),
        }
        Ok(result)
    }
}
