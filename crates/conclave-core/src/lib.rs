//! # Conclave Core
//!
//! Deliberation governance facade. Orchestrates the Consensus Engine,
//! Dissent Recorder, Coercion Filter and Disposition Router over one
//! clock and one append-only governance ledger.
//!
//! ## Governance Coverage
//!
//! | Concern | Component | Guarantee |
//! |---------|-----------|-----------|
//! | Decision | Consensus Engine | 2-of-3 supermajority, order-independent |
//! | Minority voice | Dissent Recorder | Rationale preserved, BLAKE3-witnessed |
//! | Participant safety | Coercion Filter | Block → reject → transform, fail closed |
//! | Hand-off | Disposition Router | Witnessed, idempotent, never dropped |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CONCLAVE CORE                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │    Conclave     │  ← Unified Facade        │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │      ┌──────────────┬───────┴──────┬──────────────┐             │
//! │      ▼              ▼              ▼              ▼             │
//! │ ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────┐       │
//! │ │Consensus │  │ Dissent  │  │ Coercion │  │ Disposition │       │
//! │ │  Engine  │  │ Recorder │  │  Filter  │  │   Router    │       │
//! │ └──────────┘  └────┬─────┘  └────┬─────┘  └─────────────┘       │
//! │                    └──────┬──────┘                              │
//! │                           ▼                                     │
//! │                  ┌──────────────────┐                           │
//! │                  │ Governance Ledger│  in-memory │ sled         │
//! │                  └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_core::{Conclave, ConclaveConfig, MessageKind};
//!
//! let conclave = Conclave::new(ConclaveConfig::load("conclave.json")?)?;
//!
//! let outcome = conclave.complete_deliberation(&session, &petition)?;
//! println!("routed to {}", outcome.disposition.pipeline);
//!
//! conclave.send_filtered(&mailer, "archon-7", text, MessageKind::Reminder, "scheduler")?;
//! ```
//!
//! ## Governance Notes
//!
//! - Completion runs in order: Consensus → Routing checks → Dissent → Routing → Ledger
//! - A refused completion writes nothing; a retry appends only missing events
//! - Completion is serialized per session and idempotent on retry
//! - Filter faults fail closed: a fault is a REJECTED result, never an error
//! - Raw message and rationale text never reach the logs or the ledger
//!
//! ## References
//!
//! - BLAKE3: <https://github.com/BLAKE3-team/BLAKE3-specs>
//! - Sled: <https://sled.rs/>

mod conclave;
mod config;
mod error;

pub use conclave::{Conclave, DeliberationOutcome};
pub use config::{ConclaveConfig, ConsensusConfig, FilterConfig, LedgerConfig, RouterConfig};
pub use error::ConclaveError;

// Re-export component types for convenience
pub use conclave_council::{
    ArchonId, ConsensusResult, ConsensusStatus, DeliberationPhase, DeliberationSession, DispositionOutcome,
    DissentRecord, DissentRecorder, PetitionId, SessionId,
};
pub use conclave_filter::{
    FilterDecision, FilterResult, FilteredContent, MessageKind, MessageSender, RejectionReason,
};
pub use conclave_ledger::{FixedTimeAuthority, GovernanceLedger, InMemoryLedger, SledLedger, TimeAuthority};
pub use conclave_router::{
    DispositionEmitter, DispositionResult, Petition, PetitionPriority, PetitionState, PipelineType,
};

/// Core result type for conclave operations.
pub type Result<T> = std::result::Result<T, ConclaveError>;
