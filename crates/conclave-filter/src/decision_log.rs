//! Filter decision audit log.
//!
//! Every committed filter call yields one immutable [`FilterDecisionLog`]
//! entry. Message text never appears in an entry: input and output are
//! stored as BLAKE3 hashes, and transformation records keep only a hash of
//! the matched text. Entries are appended to the governance ledger and kept
//! in a queryable [`DecisionLogStore`].

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use conclave_ledger::{content_hash, hex_hash, GovernanceEvent, Hash};
use serde::Serialize;
use uuid::Uuid;

use crate::error::FilterError;
use crate::models::{MessageKind, RejectionReason, ViolationType};
use crate::result::{FilterDecision, FilterOutcome, FilterResult, Transformation};
use crate::Result;

/// A transformation as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationRecord {
    pub rule_id: String,
    pub matched_pattern: String,
    #[serde(with = "hex_hash")]
    pub original_hash: Hash,
    pub replacement_text: String,
    pub position: usize,
}

impl From<&Transformation> for TransformationRecord {
    fn from(t: &Transformation) -> Self {
        Self {
            rule_id: t.rule_id.clone(),
            matched_pattern: t.matched_pattern.clone(),
            original_hash: content_hash(&t.original_text),
            replacement_text: t.replacement_text.clone(),
            position: t.position,
        }
    }
}

/// Decision-specific audit payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionPayload {
    Accepted {
        #[serde(with = "hex_hash")]
        output_hash: Hash,
        transformations: Vec<TransformationRecord>,
    },
    Rejected {
        reason: RejectionReason,
        guidance: String,
    },
    Blocked {
        violation: ViolationType,
        details: String,
    },
}

/// Immutable audit entry for one committed filter decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDecisionLog {
    decision_id: Uuid,
    #[serde(with = "hex_hash")]
    input_hash: Hash,
    filter_version: String,
    library_version: Option<String>,
    message_kind: MessageKind,
    submitter_id: String,
    timestamp: DateTime<Utc>,
    payload: DecisionPayload,
}

impl FilterDecisionLog {
    /// Builds the audit entry for a filter result.
    ///
    /// `input` is hashed and dropped; the accepted output (if any) is hashed
    /// from the result.
    pub fn from_result<C: AsRef<str>>(
        result: &FilterResult<C>,
        input: &str,
        message_kind: MessageKind,
        submitter_id: &str,
    ) -> Self {
        let payload = match &result.outcome {
            FilterOutcome::Accepted {
                content,
                transformations,
            } => DecisionPayload::Accepted {
                output_hash: content_hash(content.as_ref()),
                transformations: transformations.iter().map(TransformationRecord::from).collect(),
            },
            FilterOutcome::Rejected { reason, guidance } => DecisionPayload::Rejected {
                reason: *reason,
                guidance: guidance.clone(),
            },
            FilterOutcome::Blocked { violation, details } => DecisionPayload::Blocked {
                violation: *violation,
                details: details.clone(),
            },
        };

        Self {
            decision_id: Uuid::new_v4(),
            input_hash: content_hash(input),
            filter_version: result.filter_version.clone(),
            library_version: result.library_version.as_ref().map(|v| v.semver.clone()),
            message_kind,
            submitter_id: submitter_id.to_string(),
            timestamp: result.timestamp,
            payload,
        }
    }

    pub fn decision_id(&self) -> Uuid {
        self.decision_id
    }

    pub fn decision(&self) -> FilterDecision {
        match self.payload {
            DecisionPayload::Accepted { .. } => FilterDecision::Accepted,
            DecisionPayload::Rejected { .. } => FilterDecision::Rejected,
            DecisionPayload::Blocked { .. } => FilterDecision::Blocked,
        }
    }

    pub fn input_hash(&self) -> &Hash {
        &self.input_hash
    }

    /// Hash of the accepted output; `None` unless accepted.
    pub fn output_hash(&self) -> Option<&Hash> {
        match &self.payload {
            DecisionPayload::Accepted { output_hash, .. } => Some(output_hash),
            _ => None,
        }
    }

    pub fn filter_version(&self) -> &str {
        &self.filter_version
    }

    pub fn library_version(&self) -> Option<&str> {
        self.library_version.as_deref()
    }

    pub fn message_kind(&self) -> MessageKind {
        self.message_kind
    }

    pub fn submitter_id(&self) -> &str {
        &self.submitter_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &DecisionPayload {
        &self.payload
    }
}

impl GovernanceEvent for FilterDecisionLog {
    const EVENT_TYPE: &'static str = "coercion_filter.decision_logged";

    fn event_id(&self) -> Uuid {
        self.decision_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Query over stored decision entries.
#[derive(Debug, Clone, Default)]
pub struct DecisionLogQuery {
    pub submitter_id: Option<String>,
    pub decision: Option<FilterDecision>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl DecisionLogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by submitter.
    pub fn by_submitter(mut self, submitter_id: &str) -> Self {
        self.submitter_id = Some(submitter_id.to_string());
        self
    }

    /// Filter by decision kind.
    pub fn by_decision(mut self, decision: FilterDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Filter by time window `[from, to)`.
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an entry matches this query (ignores `limit`).
    pub fn matches(&self, entry: &FilterDecisionLog) -> bool {
        if let Some(submitter) = &self.submitter_id {
            if entry.submitter_id() != submitter {
                return false;
            }
        }
        if let Some(decision) = self.decision {
            if entry.decision() != decision {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.timestamp() < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.timestamp() >= to {
                return false;
            }
        }
        true
    }
}

/// Storage for decision log entries. Append-only.
pub trait DecisionLogStore: Send + Sync {
    fn append(&self, entry: FilterDecisionLog) -> Result<()>;

    /// Entries matching `query`, oldest first.
    fn query(&self, query: &DecisionLogQuery) -> Result<Vec<FilterDecisionLog>>;

    fn get(&self, decision_id: Uuid) -> Result<Option<FilterDecisionLog>>;
}

/// In-memory decision log store.
#[derive(Default)]
pub struct InMemoryDecisionLogStore {
    entries: RwLock<Vec<FilterDecisionLog>>,
}

impl InMemoryDecisionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DecisionLogStore for InMemoryDecisionLogStore {
    fn append(&self, entry: FilterDecisionLog) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|e| e.decision_id == entry.decision_id) {
            return Err(FilterError::DecisionStore {
                decision_id: entry.decision_id,
                detail: "decision already logged".to_string(),
            });
        }
        entries.push(entry);
        Ok(())
    }

    fn query(&self, query: &DecisionLogQuery) -> Result<Vec<FilterDecisionLog>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|e| query.matches(e))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn get(&self, decision_id: Uuid) -> Result<Option<FilterDecisionLog>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.iter().find(|e| e.decision_id == decision_id).cloned())
    }
}

/// Hook notified of every committed decision.
///
/// Rate limiters and monitors plug in here. Previews never notify.
pub trait FilterObserver: Send + Sync {
    fn on_decision(&self, entry: &FilterDecisionLog);
}
