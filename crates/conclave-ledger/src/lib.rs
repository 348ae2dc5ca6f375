//! # Conclave Ledger - Audit Primitives
//!
//! Shared building blocks for the Conclave deliberation core. Every other
//! crate in the workspace leans on this one for three things: fixed-width
//! digests, a single injected source of time, and the append-only
//! governance ledger boundary.
//!
//! ## Purpose
//!
//! 1. **Digests** - BLAKE3 content digests for rationale and message text,
//!    SHA-256 digests over canonical JSON for versioned rule sets.
//!
//! 2. **Time Authority** - No component reads the system clock directly.
//!    Wall-clock timestamps and monotonic instants both come from a
//!    [`TimeAuthority`], so tests can pin or step time.
//!
//! 3. **Governance Ledger** - An append-only port. There is no update or
//!    delete operation at this boundary. Events are wrapped in a versioned
//!    [`EventEnvelope`] before they are appended.
//!
//! 4. **Per-key exclusion** - [`KeyedLocks`] serializes work on the same
//!    session or petition while leaving unrelated keys uncontended.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CONCLAVE LEDGER                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌────────────┐  ┌─────────────────────────┐ │
//! │  │  DIGEST    │  │   CLOCK    │  │   GOVERNANCE LEDGER     │ │
//! │  │ BLAKE3 /   │  │ wall +     │  │  EventEnvelope ──▶ seq  │ │
//! │  │ SHA-256    │  │ monotonic  │  │  in-memory │ sled       │ │
//! │  └────────────┘  └────────────┘  └─────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use conclave_ledger::{content_hash, GovernanceLedger, InMemoryLedger};
//!
//! let digest = content_hash("minority rationale");
//! assert_eq!(digest.len(), 32);
//!
//! let ledger = InMemoryLedger::new();
//! assert!(ledger.is_empty());
//! ```
//!
//! ## References
//!
//! - BLAKE3 specification: <https://github.com/BLAKE3-team/BLAKE3-specs>
//! - RFC 8785 - JSON Canonicalization Scheme (key ordering for digests)
//! - Sled documentation: <https://sled.rs/>

pub mod clock;
pub mod digest;
pub mod event;
pub mod ledger;
pub mod models;
pub mod storage;
pub mod sync;

pub use clock::{FixedTimeAuthority, SystemTimeAuthority, TimeAuthority};
pub use digest::{canonical_hash, content_hash, hash_from_slice, hash_to_hex, hex_hash};
pub use event::{EventEnvelope, GovernanceEvent, EVENT_SCHEMA_VERSION};
pub use ledger::{record_event, GovernanceLedger, InMemoryLedger};
pub use models::{Hash, LedgerError, Result, HASH_SIZE};
pub use storage::SledLedger;
pub use sync::KeyedLocks;
