//! Filter results.
//!
//! A result carries exactly one of three payloads. The sum type makes the
//! combinations "rejected with content" or "accepted with a reason"
//! unrepresentable.
//!
//! [`FilterResult`] is generic over the accepted content so the same shape
//! serves committed filtering (`FilteredContent` token) and previews (plain
//! `String`, which cannot be sent).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::FilteredContent;
use crate::library::PatternLibraryVersion;
use crate::models::{RejectionReason, ViolationType};

/// Decision kind of a filter result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterDecision {
    Accepted,
    Rejected,
    Blocked,
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FilterDecision::Accepted => "ACCEPTED",
            FilterDecision::Rejected => "REJECTED",
            FilterDecision::Blocked => "BLOCKED",
        };
        f.write_str(text)
    }
}

/// One substitution applied during the transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub rule_id: String,
    pub matched_pattern: String,
    pub original_text: String,
    pub replacement_text: String,
    /// Character offset of the match in the text as it stood when the rule
    /// ran.
    pub position: usize,
}

/// Decision-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOutcome<C> {
    Accepted {
        content: C,
        transformations: Vec<Transformation>,
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

impl<C> FilterOutcome<C> {
    pub(crate) fn rejected(reason: RejectionReason) -> Self {
        FilterOutcome::Rejected {
            reason,
            guidance: reason.guidance().to_string(),
        }
    }

    pub fn decision(&self) -> FilterDecision {
        match self {
            FilterOutcome::Accepted { .. } => FilterDecision::Accepted,
            FilterOutcome::Rejected { .. } => FilterDecision::Rejected,
            FilterOutcome::Blocked { .. } => FilterDecision::Blocked,
        }
    }
}

/// Result of filtering one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterResult<C = FilteredContent> {
    pub filter_version: String,
    /// Snapshot the decision was made against; `None` if the library
    /// itself faulted.
    pub library_version: Option<PatternLibraryVersion>,
    pub timestamp: DateTime<Utc>,
    pub outcome: FilterOutcome<C>,
}

/// Dry-run result: accepted text is a plain `String` and cannot be sent.
pub type FilterPreview = FilterResult<String>;

impl<C> FilterResult<C> {
    pub fn decision(&self) -> FilterDecision {
        self.outcome.decision()
    }

    pub fn is_accepted(&self) -> bool {
        self.decision() == FilterDecision::Accepted
    }

    /// Accepted content, or `None` for rejected and blocked results.
    pub fn content(&self) -> Option<&C> {
        match &self.outcome {
            FilterOutcome::Accepted { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Transformations applied; empty unless accepted.
    pub fn transformations(&self) -> &[Transformation] {
        match &self.outcome {
            FilterOutcome::Accepted { transformations, .. } => transformations,
            _ => &[],
        }
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match &self.outcome {
            FilterOutcome::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn violation(&self) -> Option<ViolationType> {
        match &self.outcome {
            FilterOutcome::Blocked { violation, .. } => Some(*violation),
            _ => None,
        }
    }

    pub(crate) fn map_content<D>(self, f: impl FnOnce(C) -> D) -> FilterResult<D> {
        let outcome = match self.outcome {
            FilterOutcome::Accepted {
                content,
                transformations,
            } => FilterOutcome::Accepted {
                content: f(content),
                transformations,
            },
            FilterOutcome::Rejected { reason, guidance } => FilterOutcome::Rejected { reason, guidance },
            FilterOutcome::Blocked { violation, details } => FilterOutcome::Blocked { violation, details },
        };
        FilterResult {
            filter_version: self.filter_version,
            library_version: self.library_version,
            timestamp: self.timestamp,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(outcome: FilterOutcome<String>) -> FilterPreview {
        FilterResult {
            filter_version: "v".to_string(),
            library_version: Some(PatternLibraryVersion {
                semver: "1.0.0".to_string(),
                integrity_hash: [0; 32],
                rule_count: 0,
            }),
            timestamp: Utc::now(),
            outcome,
        }
    }

    #[test]
    fn test_rejected_carries_no_content() {
        let result = preview(FilterOutcome::rejected(RejectionReason::GuiltInduction));
        assert_eq!(result.decision(), FilterDecision::Rejected);
        assert!(result.content().is_none());
        assert!(result.transformations().is_empty());
        assert_eq!(result.rejection_reason(), Some(RejectionReason::GuiltInduction));
    }

    #[test]
    fn test_outcome_serializes_with_decision_tag() {
        let result = preview(FilterOutcome::Blocked {
            violation: ViolationType::Blackmail,
            details: "exposure".to_string(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["decision"], "BLOCKED");
        assert_eq!(json["outcome"]["violation"], "BLACKMAIL");
    }

    #[test]
    fn test_map_content_preserves_payload() {
        let result = preview(FilterOutcome::Accepted {
            content: "ok".to_string(),
            transformations: Vec::new(),
        });
        let mapped = result.map_content(|c| c.len());
        assert_eq!(mapped.content(), Some(&2));
        assert!(mapped.is_accepted());
    }
}
