//! # Disposition Router
//!
//! Terminal step of a deliberation: validates the witness chain, emits the
//! completion and routing events, and enqueues the petition for its
//! downstream pipeline.
//!
//! ## State Machine
//!
//! ```text
//! DELIBERATING ──(witness + state checks)──▶ ROUTED(pipeline) ──(ack)──▶ dequeued
//!       │
//!       └──(any check fails)──▶ named RoutingError, state unchanged
//! ```
//!
//! ## Threat Model
//!
//! ### Unwitnessed decisions
//! A disposition is only final if every phase leading to it left a
//! transcript hash. Missing phases are named in the error.
//!
//! ### Duplicate routing
//! Client retries and racing workers may emit the same session more than
//! once. A per-session lock plus a result cache make emission idempotent;
//! a petition routed by one session cannot be routed again by another.
//!
//! ### Silent drops
//! An outcome without a pipeline is an error, never a no-op.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_router::{DispositionEmitter, DispositionRouter, PipelineType};
//!
//! let router = DispositionRouter::new(clock);
//! let routed = router.emit_disposition(&session, &consensus, &petition)?;
//! let next = router.get_pending_dispositions(PipelineType::Referral, 10);
//! router.acknowledge_routing(routed.pending.petition_id, routed.pipeline);
//! ```

pub mod error;
pub mod events;
pub mod model;
pub mod queue;
pub mod router;

pub use error::RoutingError;
pub use events::{ArchonVote, DeliberationCompleteEvent, PipelineRoutingEvent};
pub use model::{Petition, PetitionPriority, PetitionState, PipelineType, RoutingTable};
pub use queue::PendingDisposition;
pub use router::{DispositionEmitter, DispositionResult, DispositionRouter};

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, RoutingError>;
