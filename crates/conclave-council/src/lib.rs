//! # Deliberation Council
//!
//! Three-archon deliberation sessions, deterministic supermajority
//! resolution, and tamper-evident dissent recording.
//!
//! ## Overview
//!
//! Every petition is deliberated by exactly three archons. Each session
//! passes through four witnessed phases (assessment, position,
//! cross-examination, vote) before it can complete. The consensus engine
//! resolves the three votes: any outcome with two votes wins, and a
//! three-way split is an explicit failure that callers must escalate.
//!
//! ## Threat Model
//!
//! ### Order-dependent outcomes
//! Vote maps are unordered. If resolution depended on iteration order, a
//! replay of the same deliberation could yield a different disposition or
//! blame a different dissenter. All derived sets are ordered and the
//! algorithm version is stamped into each result.
//!
//! ### Silent defaults
//! A split vote never falls back to a default outcome. Validation
//! failures, splits, and ambiguous dissent attribution surface as typed
//! errors naming the session and archons involved.
//!
//! ### Rationale tampering
//! Dissent rationale is hashed with BLAKE3 when recorded. Only the hash is
//! witnessed on the ledger, so later edits to the stored text are
//! detectable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │ Archon A │  │ Archon B │  │ Archon C │
//! └────┬─────┘  └────┬─────┘  └────┬─────┘
//!      └─────────────┼─────────────┘
//!                    ▼
//!         ┌─────────────────────┐
//!         │ DeliberationSession │  4 witnessed phases
//!         └──────────┬──────────┘
//!                    ▼
//!         ┌─────────────────────┐
//!         │   ConsensusEngine   │  2-of-3 supermajority
//!         └──────────┬──────────┘
//!                    ▼ (2-1 split)
//!         ┌─────────────────────┐
//!         │ArchonDissentRecorder│──▶ DissentStore + ledger
//!         └─────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_council::{ConsensusEngine, ConsensusResolver, DeliberationSession};
//!
//! let engine = ConsensusEngine::new(clock);
//! let result = engine.resolve_consensus(&session, &session.vote_map())?;
//! if result.has_dissent() {
//!     recorder.record_dissent(&session, &result, rationale)?;
//! }
//! ```
//!
//! ## References
//!
//! - [Byzantine Fault Tolerance](https://en.wikipedia.org/wiki/Byzantine_fault) - Consensus under adversarial conditions
//! - [BLAKE3](https://github.com/BLAKE3-team/BLAKE3-specs) - Rationale digest function

pub mod consensus;
pub mod dissent;
pub mod error;
pub mod model;
pub mod store;

pub use consensus::{
    ConsensusDraft, ConsensusEngine, ConsensusResolver, ConsensusResult, ConsensusStatus,
    VoteValidationResult, VoteValidationStatus, CONSENSUS_ALGORITHM_VERSION, SUPERMAJORITY_THRESHOLD,
};
pub use dissent::{ArchonDissentRecorder, DissentRecord, DissentRecordedEvent, DissentRecorder};
pub use error::CouncilError;
pub use model::{
    ArchonId, CastVote, DeliberationPhase, DeliberationSession, DispositionOutcome, PetitionId,
    SessionId, VoteMap, WitnessHash, ARCHONS_PER_SESSION,
};
pub use store::{DissentStore, InMemoryDissentStore};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;
