//! # Governance Ledger Port
//!
//! Append-only boundary to the governance ledger. The port exposes exactly
//! one mutating operation, [`GovernanceLedger::append_event`], which
//! returns the sequence number the ledger assigned. Nothing at this
//! boundary can update or delete an entry.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::event::{EventEnvelope, GovernanceEvent};
use crate::models::Result;

/// Append-only governance ledger.
pub trait GovernanceLedger: Send + Sync {
    /// Appends an event and returns its sequence number.
    ///
    /// Sequence numbers start at 1 and strictly increase.
    fn append_event(&self, event: EventEnvelope) -> Result<u64>;

    /// Makes every appended entry durable. Volatile ledgers have nothing to do.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Wraps a typed event and appends it.
///
/// # Errors
///
/// Propagates serialization and storage failures from the ledger.
pub fn record_event<E: GovernanceEvent>(ledger: &dyn GovernanceLedger, event: &E) -> Result<u64> {
    let envelope = EventEnvelope::wrap(event)?;
    let sequence = ledger.append_event(envelope)?;
    debug!("Appended {} event {} at sequence {}", E::EVENT_TYPE, event.event_id(), sequence);
    Ok(sequence)
}

/// Volatile ledger kept in process memory.
///
/// Used by tests and by deployments that mirror events elsewhere. Reads
/// are exposed for inspection; there is still no way to alter an entry.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    events: Mutex<Vec<EventEnvelope>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all appended events in sequence order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Events of one type, in sequence order.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Number of appended events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GovernanceLedger for InMemoryLedger {
    fn append_event(&self, event: EventEnvelope) -> Result<u64> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push(event);
        Ok(events.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            schema_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn test_sequences_start_at_one_and_increase() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.append_event(envelope("a")).unwrap(), 1);
        assert_eq!(ledger.append_event(envelope("b")).unwrap(), 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_events_of_type() {
        let ledger = InMemoryLedger::new();
        ledger.append_event(envelope("a")).unwrap();
        ledger.append_event(envelope("b")).unwrap();
        ledger.append_event(envelope("a")).unwrap();

        assert_eq!(ledger.events_of_type("a").len(), 2);
        assert_eq!(ledger.events_of_type("c").len(), 0);
    }
}
