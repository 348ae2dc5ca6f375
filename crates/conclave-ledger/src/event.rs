//! # Event Envelope
//!
//! Every governance event crosses the ledger boundary inside an
//! [`EventEnvelope`]. The envelope fixes the serialized shape for replay:
//!
//! - `event_id` - UUID string
//! - `event_type` - stable dotted name (e.g. `deliberation.completed`)
//! - `schema_version` - explicit integer, bumped on breaking payload changes
//! - `occurred_at` - ISO-8601 / RFC 3339 UTC timestamp
//! - `payload` - the event body as JSON; ids are strings and enums are
//!   named string values, never raw integers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Result;

/// Current schema version stamped on every envelope and event payload.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// An immutable event destined for the governance ledger.
pub trait GovernanceEvent: Serialize {
    /// Stable event type name.
    const EVENT_TYPE: &'static str;

    /// Unique id of this event.
    fn event_id(&self) -> Uuid;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Versioned wrapper appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event id.
    pub event_id: Uuid,
    /// Stable event type name.
    pub event_type: String,
    /// Payload schema version.
    pub schema_version: u32,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Serialized event body.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wraps a typed event.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Serialization` if the event cannot be
    /// serialized.
    pub fn wrap<E: GovernanceEvent>(event: &E) -> Result<Self> {
        Ok(Self {
            event_id: event.event_id(),
            event_type: E::EVENT_TYPE.to_string(),
            schema_version: EVENT_SCHEMA_VERSION,
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
        })
    }
}
