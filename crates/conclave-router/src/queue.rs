//! Per-pipeline priority queues of pending dispositions.
//!
//! Each pipeline has its own mutex, so routing into one pipeline never
//! waits on another. Entries are ordered by priority (highest first), then
//! enqueue time, then enqueue sequence.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use conclave_council::{DispositionOutcome, PetitionId, SessionId};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{PetitionPriority, PipelineType};

/// A routed petition waiting for its pipeline to pick it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDisposition {
    pub petition_id: PetitionId,
    pub session_id: SessionId,
    pub pipeline: PipelineType,
    pub outcome: DispositionOutcome,
    pub priority: PetitionPriority,
    pub routing_event_id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    /// Tie-breaker for entries enqueued at the same instant.
    pub sequence: u64,
}

impl PendingDisposition {
    fn order_key(&self) -> (Reverse<PetitionPriority>, DateTime<Utc>, u64) {
        (Reverse(self.priority), self.enqueued_at, self.sequence)
    }
}

pub(crate) struct PipelineQueues {
    queues: BTreeMap<PipelineType, Mutex<Vec<PendingDisposition>>>,
}

impl PipelineQueues {
    pub(crate) fn new() -> Self {
        Self {
            queues: PipelineType::ALL
                .into_iter()
                .map(|p| (p, Mutex::new(Vec::new())))
                .collect(),
        }
    }

    fn with_queue<R>(&self, pipeline: PipelineType, f: impl FnOnce(&mut Vec<PendingDisposition>) -> R) -> Option<R> {
        self.queues
            .get(&pipeline)
            .map(|q| f(&mut q.lock().unwrap_or_else(PoisonError::into_inner)))
    }

    pub(crate) fn push(&self, entry: PendingDisposition) {
        self.with_queue(entry.pipeline, |queue| {
            let key = entry.order_key();
            let at = queue.partition_point(|e| e.order_key() <= key);
            queue.insert(at, entry);
        });
    }

    pub(crate) fn peek(&self, pipeline: PipelineType, limit: usize) -> Vec<PendingDisposition> {
        self.with_queue(pipeline, |queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the first entry for `petition_id`.
    pub(crate) fn remove(&self, pipeline: PipelineType, petition_id: PetitionId) -> bool {
        self.with_queue(pipeline, |queue| {
            match queue.iter().position(|e| e.petition_id == petition_id) {
                Some(index) => {
                    queue.remove(index);
                    true
                }
                None => false,
            }
        })
        .unwrap_or(false)
    }

    pub(crate) fn len(&self, pipeline: PipelineType) -> usize {
        self.with_queue(pipeline, |queue| queue.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(priority: PetitionPriority, at: DateTime<Utc>, sequence: u64) -> PendingDisposition {
        PendingDisposition {
            petition_id: PetitionId::new(),
            session_id: SessionId::new(),
            pipeline: PipelineType::Referral,
            outcome: DispositionOutcome::Refer,
            priority,
            routing_event_id: Uuid::new_v4(),
            enqueued_at: at,
            sequence,
        }
    }

    #[test]
    fn test_priority_then_time_order() {
        let queues = PipelineQueues::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);

        let late_high = entry(PetitionPriority::High, t1, 1);
        let early_normal = entry(PetitionPriority::Normal, t0, 2);
        let early_high = entry(PetitionPriority::High, t0, 3);
        let critical = entry(PetitionPriority::Critical, t1, 4);

        for e in [&late_high, &early_normal, &early_high, &critical] {
            queues.push(e.clone());
        }

        let order: Vec<PetitionId> = queues
            .peek(PipelineType::Referral, 10)
            .into_iter()
            .map(|e| e.petition_id)
            .collect();
        assert_eq!(
            order,
            vec![
                critical.petition_id,
                early_high.petition_id,
                late_high.petition_id,
                early_normal.petition_id
            ]
        );
        assert_eq!(queues.peek(PipelineType::Referral, 2).len(), 2);
        assert_eq!(queues.len(PipelineType::Escalation), 0);
    }

    #[test]
    fn test_remove_first_match_only() {
        let queues = PipelineQueues::new();
        let e = entry(PetitionPriority::Normal, Utc::now(), 1);
        queues.push(e.clone());

        assert!(!queues.remove(PipelineType::Escalation, e.petition_id));
        assert!(queues.remove(PipelineType::Referral, e.petition_id));
        assert!(!queues.remove(PipelineType::Referral, e.petition_id));
        assert_eq!(queues.len(PipelineType::Referral), 0);
    }
}
