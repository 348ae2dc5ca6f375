//! # Coercion Filter
//!
//! Mandatory content-safety gate for every participant-facing message.
//!
//! ## Overview
//!
//! Text passes through four fixed stages (block, reject, transform,
//! validate). Accepted text is wrapped in a [`FilteredContent`] token that
//! only the pipeline can construct, and [`MessageSender`] accepts nothing
//! else. Every committed decision is hashed into a [`FilterDecisionLog`]
//! entry and appended to the governance ledger.
//!
//! ## Threat Model
//!
//! ### Bypass
//! A sender that accepted `&str` could be handed unfiltered text. The
//! delivery port takes `&FilteredContent`, which has a crate-private
//! constructor and no `Deserialize` impl.
//!
//! ### Fail-open faults
//! A broken rule or a crash inside matching must never release content.
//! Malformed patterns, panics and budget overruns all become REJECTED.
//!
//! ### Audit leakage
//! The decision log must not become a second copy of participant messages.
//! It stores BLAKE3 hashes of input, output and matched text.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   snapshot   ┌──────────────────────┐
//! │ PatternLibrary │─────────────▶│ CoercionFilterPipeline│
//! └────────────────┘              └──────────┬───────────┘
//!                                            │ FilterResult
//!                   ┌────────────────────────┼──────────────────┐
//!                   ▼                        ▼                  ▼
//!          ┌─────────────────┐     ┌──────────────────┐  ┌──────────────┐
//!          │ DecisionLogStore│     │ GovernanceLedger │  │FilterObserver│
//!          └─────────────────┘     └──────────────────┘  └──────────────┘
//! ```
//!
//! ## References
//!
//! - [Fail-safe defaults](https://en.wikipedia.org/wiki/Fail-safe) - Saltzer & Schroeder design principles
//! - [Regex crate](https://docs.rs/regex) - Linear-time matching, no catastrophic backtracking

pub mod content;
pub mod decision_log;
pub mod error;
pub mod library;
pub mod models;
pub mod pipeline;
pub mod result;

pub use content::{DeliveryError, FilteredContent, MessageSender};
pub use decision_log::{
    DecisionLogQuery, DecisionLogStore, DecisionPayload, FilterDecisionLog, FilterObserver,
    InMemoryDecisionLogStore, TransformationRecord,
};
pub use error::FilterError;
pub use library::{
    default_patterns, CompiledPattern, PatternLibrary, PatternLibrarySnapshot, PatternLibraryVersion,
    StaticPatternLibrary, DEFAULT_LIBRARY_VERSION,
};
pub use models::{
    CoercionCategory, CoercionPattern, MessageKind, PatternSeverity, RejectionReason, ViolationType,
};
pub use pipeline::{
    CoercionFilter, CoercionFilterPipeline, DEFAULT_FILTER_VERSION, DEFAULT_PROCESSING_BUDGET,
};
pub use result::{FilterDecision, FilterOutcome, FilterPreview, FilterResult, Transformation};

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;
