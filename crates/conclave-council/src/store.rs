//! Dissent persistence port.
//!
//! Records are indexed three ways: by session (unique), by petition, and by
//! dissenting archon. The in-memory store is the reference adapter; a
//! persistent store plugs in behind the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::dissent::DissentRecord;
use crate::error::CouncilError;
use crate::model::{ArchonId, PetitionId, SessionId};
use crate::Result;

/// Storage for dissent records.
pub trait DissentStore: Send + Sync {
    /// Persists a record.
    ///
    /// # Errors
    ///
    /// `CouncilError::DissentAlreadyRecorded` if the session already has one.
    fn save(&self, record: DissentRecord) -> Result<()>;

    fn by_session(&self, session_id: SessionId) -> Result<Option<DissentRecord>>;

    /// All dissents on a petition, oldest first.
    fn by_petition(&self, petition_id: PetitionId) -> Result<Vec<DissentRecord>>;

    /// All dissents cast by an archon, oldest first.
    fn by_archon(&self, archon_id: &ArchonId) -> Result<Vec<DissentRecord>>;
}

#[derive(Default)]
struct Indexes {
    records: HashMap<SessionId, DissentRecord>,
    by_petition: HashMap<PetitionId, Vec<SessionId>>,
    by_archon: HashMap<ArchonId, Vec<SessionId>>,
}

impl Indexes {
    fn collect(&self, sessions: Option<&Vec<SessionId>>) -> Vec<DissentRecord> {
        sessions
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }
}

/// Mutex-guarded in-memory dissent store.
#[derive(Default)]
pub struct InMemoryDissentStore {
    inner: RwLock<Indexes>,
}

impl InMemoryDissentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DissentStore for InMemoryDissentStore {
    fn save(&self, record: DissentRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let session_id = record.session_id();
        if inner.records.contains_key(&session_id) {
            return Err(CouncilError::DissentAlreadyRecorded { session_id });
        }

        inner
            .by_petition
            .entry(record.petition_id())
            .or_default()
            .push(session_id);
        inner
            .by_archon
            .entry(record.dissent_archon_id().clone())
            .or_default()
            .push(session_id);
        inner.records.insert(session_id, record);
        Ok(())
    }

    fn by_session(&self, session_id: SessionId) -> Result<Option<DissentRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.records.get(&session_id).cloned())
    }

    fn by_petition(&self, petition_id: PetitionId) -> Result<Vec<DissentRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.collect(inner.by_petition.get(&petition_id)))
    }

    fn by_archon(&self, archon_id: &ArchonId) -> Result<Vec<DissentRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.collect(inner.by_archon.get(archon_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DispositionOutcome;
    use chrono::Utc;

    fn record(petition_id: PetitionId, archon: &str) -> DissentRecord {
        DissentRecord::new(
            SessionId::new(),
            petition_id,
            ArchonId::from(archon),
            DispositionOutcome::Refer,
            DispositionOutcome::Acknowledge,
            "minority view",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_indexes_by_petition_and_archon() {
        let store = InMemoryDissentStore::new();
        let petition = PetitionId::new();
        let first = record(petition, "alice");
        let second = record(petition, "bob");
        let other = record(PetitionId::new(), "alice");

        store.save(first.clone()).unwrap();
        store.save(second.clone()).unwrap();
        store.save(other.clone()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.by_petition(petition).unwrap(), vec![first.clone(), second]);
        assert_eq!(store.by_archon(&ArchonId::from("alice")).unwrap(), vec![first.clone(), other]);
        assert_eq!(store.by_session(first.session_id()).unwrap(), Some(first));
    }

    #[test]
    fn test_duplicate_session_rejected() {
        let store = InMemoryDissentStore::new();
        let r = record(PetitionId::new(), "carol");
        store.save(r.clone()).unwrap();

        let err = store.save(r).unwrap_err();
        assert!(matches!(err, CouncilError::DissentAlreadyRecorded { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_empty() {
        let store = InMemoryDissentStore::new();
        assert!(store.is_empty());
        assert!(store.by_session(SessionId::new()).unwrap().is_none());
        assert!(store.by_petition(PetitionId::new()).unwrap().is_empty());
        assert!(store.by_archon(&ArchonId::from("nobody")).unwrap().is_empty());
    }
}
