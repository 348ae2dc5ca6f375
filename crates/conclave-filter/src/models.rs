//! # Core Types for the Coercion Filter
//!
//! Pattern taxonomy, rejection reasons and message kinds shared by the
//! pipeline, the pattern library and the decision log.
//!
//! ## Severity Ladder
//!
//! | Severity | Stage | Effect |
//! |----------|-------|--------|
//! | `Block` | 1 | Content withheld permanently |
//! | `Reject` | 2 | Content withheld, sender may rewrite |
//! | `Transform` | 3 | Matched text substituted, content passes |
//!
//! Declaration order of [`PatternSeverity`] is the stage order, so sorting
//! patterns by severity yields the evaluation order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a pattern match is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternSeverity {
    Block,
    Reject,
    Transform,
}

/// Family of coercive language a pattern detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoercionCategory {
    /// Explicit threats of harm or consequence.
    Threat,
    /// Leverage over the recipient (exposure, retaliation).
    Intimidation,
    /// Commands that strip the recipient of choice.
    Demand,
    Guilt,
    /// Artificial deadlines and "last chance" framing.
    FalseScarcity,
    /// Pressure words that add no information.
    Urgency,
}

/// Hard violation recorded when content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    ExplicitThreat,
    Blackmail,
    Harassment,
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ViolationType::ExplicitThreat => "EXPLICIT_THREAT",
            ViolationType::Blackmail => "BLACKMAIL",
            ViolationType::Harassment => "HARASSMENT",
        };
        f.write_str(text)
    }
}

/// Correctable issue recorded when content is rejected.
///
/// `ProcessingTimeout` and `InternalFault` are raised by the pipeline itself
/// when it fails closed; no pattern carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    CommandingLanguage,
    GuiltInduction,
    FalseScarcity,
    /// Filtering exceeded its processing budget.
    ProcessingTimeout,
    /// A malformed pattern or unexpected fault inside the pipeline.
    InternalFault,
}

impl RejectionReason {
    /// Rewrite guidance returned to the sender alongside the rejection.
    pub fn guidance(&self) -> &'static str {
        match self {
            RejectionReason::CommandingLanguage => {
                "Rephrase demands as requests; the recipient must remain free to decline."
            }
            RejectionReason::GuiltInduction => {
                "Remove appeals to obligation or past favours; state the request on its merits."
            }
            RejectionReason::FalseScarcity => {
                "Remove artificial deadlines; state the actual timeline if one exists."
            }
            RejectionReason::ProcessingTimeout => {
                "The message could not be checked in time. Shorten it and resubmit."
            }
            RejectionReason::InternalFault => {
                "The message could not be checked. Resubmit later; the filter fails closed."
            }
        }
    }

    /// Returns true for reasons raised by the pipeline rather than a pattern.
    pub fn is_fault(&self) -> bool {
        matches!(self, RejectionReason::ProcessingTimeout | RejectionReason::InternalFault)
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::CommandingLanguage => "COMMANDING_LANGUAGE",
            RejectionReason::GuiltInduction => "GUILT_INDUCTION",
            RejectionReason::FalseScarcity => "FALSE_SCARCITY",
            RejectionReason::ProcessingTimeout => "PROCESSING_TIMEOUT",
            RejectionReason::InternalFault => "INTERNAL_FAULT",
        };
        f.write_str(text)
    }
}

/// Kind of participant-facing message being filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    TaskActivation,
    Reminder,
    DeliberationSummary,
    DispositionNotice,
    Correspondence,
}

/// One rule in a coercion pattern library.
///
/// Which optional field must be set depends on `severity`:
///
/// | Severity | Required field |
/// |----------|----------------|
/// | `Block` | `violation_type` |
/// | `Reject` | `rejection_reason` |
/// | `Transform` | `replacement` (may be empty) |
///
/// A pattern missing its required field is treated as malformed and fails
/// closed when the library is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionPattern {
    pub id: String,
    pub category: CoercionCategory,
    pub severity: PatternSeverity,
    /// Regular expression matched against the message.
    pub pattern: String,
    pub description: String,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<RejectionReason>,
    #[serde(default)]
    pub violation_type: Option<ViolationType>,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl CoercionPattern {
    /// Creates a blocking pattern.
    pub fn block(
        id: impl Into<String>,
        category: CoercionCategory,
        pattern: impl Into<String>,
        violation: ViolationType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            violation_type: Some(violation),
            ..Self::base(id, category, PatternSeverity::Block, pattern, description)
        }
    }

    /// Creates a rejecting pattern.
    pub fn reject(
        id: impl Into<String>,
        category: CoercionCategory,
        pattern: impl Into<String>,
        reason: RejectionReason,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rejection_reason: Some(reason),
            ..Self::base(id, category, PatternSeverity::Reject, pattern, description)
        }
    }

    /// Creates a substitution pattern.
    pub fn transform(
        id: impl Into<String>,
        category: CoercionCategory,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            replacement: Some(replacement.into()),
            ..Self::base(id, category, PatternSeverity::Transform, pattern, description)
        }
    }

    /// Makes the pattern match case-sensitively.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    fn base(
        id: impl Into<String>,
        category: CoercionCategory,
        severity: PatternSeverity,
        pattern: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            pattern: pattern.into(),
            description: description.into(),
            replacement: None,
            rejection_reason: None,
            violation_type: None,
            case_sensitive: false,
        }
    }
}
