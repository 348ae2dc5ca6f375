//! # Persistent Ledger Storage
//!
//! A sled-backed implementation of the [`GovernanceLedger`] port. Entries
//! live in a single tree keyed by big-endian sequence number so that a
//! plain iteration returns them in append order.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `events` | 8-byte big-endian sequence | JSON `EventEnvelope` |
//!
//! ## Security Notes
//!
//! - The adapter never overwrites a key; sequence numbers come from sled's
//!   crash-safe id generator, which is monotonic across restarts
//! - The database file should live on storage with restricted permissions
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use std::path::Path;

use tracing::debug;

use crate::event::EventEnvelope;
use crate::ledger::GovernanceLedger;
use crate::models::{LedgerError, Result};

/// Tree name for ledger entries.
const EVENT_TREE: &str = "events";

/// Append-only ledger persisted with sled.
///
/// # Example
///
/// ```rust
/// use conclave_ledger::{SledLedger, GovernanceLedger, EventEnvelope};
///
/// let ledger = SledLedger::temporary().unwrap();
/// assert_eq!(ledger.len(), 0);
/// ```
#[derive(Clone)]
pub struct SledLedger {
    db: sled::Db,
    events: sled::Tree,
}

impl SledLedger {
    /// Opens or creates a ledger database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Database` if the path is unusable or the
    /// database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let events = db.open_tree(EVENT_TREE)?;
        Ok(Self { db, events })
    }

    /// Creates a temporary ledger that is discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let events = db.open_tree(EVENT_TREE)?;
        Ok(Self { db, events })
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Reads every entry in append order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CorruptEntry` if a key or value cannot be
    /// decoded.
    pub fn read_all(&self) -> Result<Vec<(u64, EventEnvelope)>> {
        let mut entries = Vec::with_capacity(self.events.len());
        for item in self.events.iter() {
            let (key, value) = item?;
            let sequence = decode_sequence(&key)?;
            let envelope = serde_json::from_slice(&value).map_err(|e| LedgerError::CorruptEntry {
                sequence,
                detail: e.to_string(),
            })?;
            entries.push((sequence, envelope));
        }
        Ok(entries)
    }
}

impl GovernanceLedger for SledLedger {
    fn append_event(&self, event: EventEnvelope) -> Result<u64> {
        let sequence = self.db.generate_id()? + 1;
        let bytes = serde_json::to_vec(&event)?;

        let previous = self
            .events
            .compare_and_swap(sequence.to_be_bytes(), None as Option<&[u8]>, Some(bytes))?;
        if previous.is_err() {
            return Err(LedgerError::CorruptEntry {
                sequence,
                detail: "sequence already occupied".to_string(),
            });
        }

        debug!("Persisted ledger entry {} ({})", sequence, event.event_type);
        Ok(sequence)
    }

    fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        debug!("Flushed {} bytes of ledger entries", bytes);
        Ok(())
    }
}

fn decode_sequence(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| LedgerError::CorruptEntry {
        sequence: 0,
        detail: format!("key of {} bytes", key.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            schema_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({"petition_id": "p-1"}),
        }
    }

    #[test]
    fn test_append_and_read_in_order() {
        let ledger = SledLedger::temporary().unwrap();
        let first = ledger.append_event(envelope("a")).unwrap();
        let second = ledger.append_event(envelope("b")).unwrap();
        assert!(second > first);

        let entries = ledger.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1.event_type, "a");
        assert_eq!(entries[1].1.event_type, "b");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");

        let last = {
            let ledger = SledLedger::open(&path).unwrap();
            ledger.append_event(envelope("a")).unwrap();
            let seq = ledger.append_event(envelope("b")).unwrap();
            ledger.flush().unwrap();
            seq
        };

        let reopened = SledLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let next = reopened.append_event(envelope("c")).unwrap();
        assert!(next > last);
    }
}
