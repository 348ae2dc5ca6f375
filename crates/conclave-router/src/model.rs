//! Pipelines, routing table and petition records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use conclave_council::{DispositionOutcome, PetitionId};
use serde::{Deserialize, Serialize};

/// Downstream pipeline receiving routed petitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineType {
    Acknowledgment,
    Referral,
    Escalation,
}

impl PipelineType {
    pub const ALL: [PipelineType; 3] = [
        PipelineType::Acknowledgment,
        PipelineType::Referral,
        PipelineType::Escalation,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PipelineType::Acknowledgment => "ACKNOWLEDGMENT",
            PipelineType::Referral => "REFERRAL",
            PipelineType::Escalation => "ESCALATION",
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome → pipeline mapping.
///
/// The default table is total over [`DispositionOutcome`]. A custom table
/// may leave outcomes unmapped; routing such an outcome is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    routes: BTreeMap<DispositionOutcome, PipelineType>,
}

impl RoutingTable {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_route(mut self, outcome: DispositionOutcome, pipeline: PipelineType) -> Self {
        self.routes.insert(outcome, pipeline);
        self
    }

    pub fn route(&self, outcome: DispositionOutcome) -> Option<PipelineType> {
        self.routes.get(&outcome).copied()
    }

    /// Outcomes with no pipeline.
    pub fn unmapped(&self) -> Vec<DispositionOutcome> {
        DispositionOutcome::ALL
            .into_iter()
            .filter(|o| !self.routes.contains_key(o))
            .collect()
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::empty()
            .with_route(DispositionOutcome::Acknowledge, PipelineType::Acknowledgment)
            .with_route(DispositionOutcome::Refer, PipelineType::Referral)
            .with_route(DispositionOutcome::Escalate, PipelineType::Escalation)
    }
}

/// Lifecycle state of a petition as seen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetitionState {
    Received,
    Deliberating,
    Routed,
    Withdrawn,
}

/// Queue priority. Higher variants are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetitionPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Petition record supplied by the petition store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Petition {
    pub petition_id: PetitionId,
    pub state: PetitionState,
    pub priority: PetitionPriority,
    pub submitted_at: DateTime<Utc>,
}

impl Petition {
    /// A petition currently under deliberation.
    pub fn deliberating(petition_id: PetitionId, priority: PetitionPriority, submitted_at: DateTime<Utc>) -> Self {
        Self {
            petition_id,
            state: PetitionState::Deliberating,
            priority,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_total() {
        let table = RoutingTable::default();
        assert!(table.unmapped().is_empty());
        assert_eq!(table.route(DispositionOutcome::Acknowledge), Some(PipelineType::Acknowledgment));
        assert_eq!(table.route(DispositionOutcome::Refer), Some(PipelineType::Referral));
        assert_eq!(table.route(DispositionOutcome::Escalate), Some(PipelineType::Escalation));
    }

    #[test]
    fn test_partial_table_reports_unmapped() {
        let table = RoutingTable::empty().with_route(DispositionOutcome::Refer, PipelineType::Referral);
        assert_eq!(
            table.unmapped(),
            vec![DispositionOutcome::Acknowledge, DispositionOutcome::Escalate]
        );
        assert_eq!(table.route(DispositionOutcome::Escalate), None);
    }

    #[test]
    fn test_table_serializes_as_outcome_map() {
        let json = serde_json::to_value(RoutingTable::default()).unwrap();
        assert_eq!(json["REFER"], "REFERRAL");

        let parsed: RoutingTable =
            serde_json::from_str(r#"{"ESCALATE": "REFERRAL"}"#).unwrap();
        assert_eq!(parsed.route(DispositionOutcome::Escalate), Some(PipelineType::Referral));
    }

    #[test]
    fn test_priority_order() {
        assert!(PetitionPriority::Critical > PetitionPriority::High);
        assert!(PetitionPriority::Low < PetitionPriority::Normal);
        assert_eq!(PetitionPriority::default(), PetitionPriority::Normal);
    }
}
