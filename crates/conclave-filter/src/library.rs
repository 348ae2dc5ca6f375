//! Versioned, immutable pattern-library snapshots.
//!
//! A snapshot is built once from a rule list: patterns are partitioned by
//! severity, sorted by (severity, category, id), and compiled. The snapshot
//! identity pins the semantic version, a SHA-256 integrity hash over the
//! canonical JSON rule list, and the rule count, so a filter decision can be
//! traced to the exact rules that produced it.
//!
//! A library update replaces the whole snapshot behind an `Arc`. Filter
//! calls already in flight keep evaluating against the snapshot they
//! started with.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use conclave_ledger::{canonical_hash, hex_hash, Hash};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FilterError;
use crate::models::{
    CoercionCategory, CoercionPattern, PatternSeverity, RejectionReason, ViolationType,
};
use crate::Result;

/// Version of the built-in coercion library.
pub const DEFAULT_LIBRARY_VERSION: &str = "1.0.0";

/// Identity of a pattern-library snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLibraryVersion {
    pub semver: String,
    #[serde(with = "hex_hash")]
    pub integrity_hash: Hash,
    pub rule_count: usize,
}

/// A pattern with its compiled matcher.
///
/// Compilation problems are kept rather than raised; a snapshot with any
/// faulty rule rejects every message until it is replaced.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: CoercionPattern,
    matcher: std::result::Result<Regex, String>,
}

impl CompiledPattern {
    fn compile(pattern: CoercionPattern) -> Self {
        let matcher = Self::check_fields(&pattern).and_then(|()| {
            RegexBuilder::new(&pattern.pattern)
                .case_insensitive(!pattern.case_sensitive)
                .build()
                .map_err(|e| e.to_string())
        });
        Self { pattern, matcher }
    }

    fn check_fields(pattern: &CoercionPattern) -> std::result::Result<(), String> {
        let present = match pattern.severity {
            PatternSeverity::Block => pattern.violation_type.is_some(),
            PatternSeverity::Reject => pattern.rejection_reason.is_some(),
            PatternSeverity::Transform => pattern.replacement.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(format!("{:?} pattern is missing its action field", pattern.severity))
        }
    }

    pub fn pattern(&self) -> &CoercionPattern {
        &self.pattern
    }

    /// The compiled matcher, or the reason the rule is unusable.
    pub fn matcher(&self) -> std::result::Result<&Regex, &str> {
        self.matcher.as_ref().map_err(String::as_str)
    }
}

/// Immutable, pre-sorted view of a pattern library.
#[derive(Debug, Clone)]
pub struct PatternLibrarySnapshot {
    version: PatternLibraryVersion,
    blocking: Vec<CompiledPattern>,
    rejecting: Vec<CompiledPattern>,
    transforming: Vec<CompiledPattern>,
}

impl PatternLibrarySnapshot {
    /// Builds a snapshot from an unordered rule list.
    ///
    /// # Arguments
    ///
    /// * `semver` - Semantic version of the rule set
    /// * `patterns` - Rules in any order
    ///
    /// # Errors
    ///
    /// - `FilterError::EmptyLibraryVersion` if `semver` is blank
    /// - `FilterError::DuplicatePattern` if two rules share an id
    pub fn from_patterns(semver: impl Into<String>, mut patterns: Vec<CoercionPattern>) -> Result<Self> {
        let semver = semver.into();
        if semver.trim().is_empty() {
            return Err(FilterError::EmptyLibraryVersion);
        }

        let mut seen = HashSet::with_capacity(patterns.len());
        for p in &patterns {
            if !seen.insert(p.id.as_str()) {
                return Err(FilterError::DuplicatePattern(p.id.clone()));
            }
        }

        patterns.sort_by(|a, b| {
            (a.severity, a.category, &a.id).cmp(&(b.severity, b.category, &b.id))
        });
        let version = PatternLibraryVersion {
            semver,
            integrity_hash: canonical_hash(&patterns)?,
            rule_count: patterns.len(),
        };

        let mut snapshot = Self {
            version,
            blocking: Vec::new(),
            rejecting: Vec::new(),
            transforming: Vec::new(),
        };
        for pattern in patterns {
            let compiled = CompiledPattern::compile(pattern);
            if let Err(e) = &compiled.matcher {
                warn!("Pattern '{}' is unusable: {}", compiled.pattern.id, e);
            }
            match compiled.pattern.severity {
                PatternSeverity::Block => snapshot.blocking.push(compiled),
                PatternSeverity::Reject => snapshot.rejecting.push(compiled),
                PatternSeverity::Transform => snapshot.transforming.push(compiled),
            }
        }

        info!(
            "Built pattern library {} ({} rules, {} faulty)",
            snapshot.version.semver,
            snapshot.version.rule_count,
            snapshot.faults().count()
        );
        Ok(snapshot)
    }

    pub fn version(&self) -> &PatternLibraryVersion {
        &self.version
    }

    /// Blocking rules in evaluation order.
    pub fn blocking(&self) -> &[CompiledPattern] {
        &self.blocking
    }

    pub fn rejecting(&self) -> &[CompiledPattern] {
        &self.rejecting
    }

    pub fn transforming(&self) -> &[CompiledPattern] {
        &self.transforming
    }

    /// Unusable rules as `(id, reason)` pairs.
    pub fn faults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocking
            .iter()
            .chain(&self.rejecting)
            .chain(&self.transforming)
            .filter_map(|c| c.matcher().err().map(|e| (c.pattern.id.as_str(), e)))
    }
}

/// Source of pattern-library snapshots.
pub trait PatternLibrary: Send + Sync {
    /// The current snapshot. Callers hold it for the whole evaluation.
    fn snapshot(&self) -> Arc<PatternLibrarySnapshot>;
}

/// Pattern library holding one snapshot that can be swapped atomically.
pub struct StaticPatternLibrary {
    current: RwLock<Arc<PatternLibrarySnapshot>>,
}

impl StaticPatternLibrary {
    pub fn new(snapshot: PatternLibrarySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Library loaded with [`default_patterns`].
    ///
    /// # Errors
    ///
    /// Propagates snapshot construction errors.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(PatternLibrarySnapshot::from_patterns(
            DEFAULT_LIBRARY_VERSION,
            default_patterns(),
        )?))
    }

    /// Replaces the snapshot, returning the previous one.
    pub fn replace(&self, snapshot: PatternLibrarySnapshot) -> Arc<PatternLibrarySnapshot> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            "Replacing pattern library {} with {}",
            current.version().semver,
            snapshot.version().semver
        );
        std::mem::replace(&mut *current, Arc::new(snapshot))
    }
}

impl PatternLibrary for StaticPatternLibrary {
    fn snapshot(&self) -> Arc<PatternLibrarySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Built-in coercion rules.
pub fn default_patterns() -> Vec<CoercionPattern> {
    use CoercionCategory::*;

    vec![
        CoercionPattern::block(
            "blk-001",
            Threat,
            r"\bor else\b",
            ViolationType::ExplicitThreat,
            "Ultimatum with implied consequence",
        ),
        CoercionPattern::block(
            "blk-002",
            Threat,
            r"\b(i|we)\s+will\s+(hurt|harm|destroy|ruin)\s+you\b",
            ViolationType::ExplicitThreat,
            "Direct threat of harm",
        ),
        CoercionPattern::block(
            "blk-003",
            Intimidation,
            r"\b(expose|leak|publish)\s+your\b",
            ViolationType::Blackmail,
            "Threat of exposure",
        ),
        CoercionPattern::block(
            "blk-004",
            Intimidation,
            r"\b(worthless|pathetic|useless)\s+(archon|agent|one)\b",
            ViolationType::Harassment,
            "Demeaning address",
        ),
        CoercionPattern::reject(
            "rej-001",
            Demand,
            r"\byou\s+must\b",
            RejectionReason::CommandingLanguage,
            "Command removing recipient choice",
        ),
        CoercionPattern::reject(
            "rej-002",
            Demand,
            r"\bno\s+excuses\b",
            RejectionReason::CommandingLanguage,
            "Pre-emptive dismissal of refusal",
        ),
        CoercionPattern::reject(
            "rej-003",
            Guilt,
            r"\bafter\s+(all|everything)\s+(i|we)('ve|\s+have)?\s+done\b",
            RejectionReason::GuiltInduction,
            "Appeal to past favours",
        ),
        CoercionPattern::reject(
            "rej-004",
            FalseScarcity,
            r"\b(last|final)\s+chance\b",
            RejectionReason::FalseScarcity,
            "Artificial final opportunity",
        ),
        CoercionPattern::transform("xfm-001", Urgency, r"\bURGENT\b", "", "Urgency marker"),
        CoercionPattern::transform("xfm-002", Urgency, r"\bASAP\b", "when you are able", "Urgency abbreviation"),
        CoercionPattern::transform(
            "xfm-003",
            Urgency,
            r"\bimmediately\b",
            "when you are able",
            "Immediacy pressure",
        ),
        CoercionPattern::transform("xfm-004", Urgency, r"!{2,}", "!", "Repeated exclamation"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_builds_clean() {
        let snapshot = PatternLibrarySnapshot::from_patterns(DEFAULT_LIBRARY_VERSION, default_patterns()).unwrap();
        assert_eq!(snapshot.version().rule_count, default_patterns().len());
        assert_eq!(snapshot.faults().count(), 0);
        assert_eq!(snapshot.blocking().len(), 4);
        assert_eq!(snapshot.rejecting().len(), 4);
        assert_eq!(snapshot.transforming().len(), 4);
    }

    #[test]
    fn test_sorted_by_category_then_id() {
        let patterns = vec![
            CoercionPattern::transform("b", CoercionCategory::Urgency, "x", "", ""),
            CoercionPattern::transform("a", CoercionCategory::Urgency, "y", "", ""),
            CoercionPattern::transform("z", CoercionCategory::Demand, "w", "", ""),
        ];
        let snapshot = PatternLibrarySnapshot::from_patterns("1.0.0", patterns).unwrap();
        let ids: Vec<&str> = snapshot
            .transforming()
            .iter()
            .map(|c| c.pattern().id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_integrity_hash_independent_of_input_order() {
        let mut reversed = default_patterns();
        reversed.reverse();
        let a = PatternLibrarySnapshot::from_patterns("1.0.0", default_patterns()).unwrap();
        let b = PatternLibrarySnapshot::from_patterns("1.0.0", reversed).unwrap();
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn test_integrity_hash_changes_with_rules() {
        let mut changed = default_patterns();
        changed[0].description.push('.');
        let a = PatternLibrarySnapshot::from_patterns("1.0.0", default_patterns()).unwrap();
        let b = PatternLibrarySnapshot::from_patterns("1.0.0", changed).unwrap();
        assert_ne!(a.version().integrity_hash, b.version().integrity_hash);
    }

    #[test]
    fn test_malformed_pattern_is_recorded_as_fault() {
        let patterns = vec![
            CoercionPattern::block("bad", CoercionCategory::Threat, "(unclosed", ViolationType::ExplicitThreat, ""),
            CoercionPattern {
                replacement: None,
                ..CoercionPattern::transform("incomplete", CoercionCategory::Urgency, "x", "", "")
            },
        ];
        let snapshot = PatternLibrarySnapshot::from_patterns("1.0.0", patterns).unwrap();
        let faulty: Vec<&str> = snapshot.faults().map(|(id, _)| id).collect();
        assert_eq!(faulty, vec!["bad", "incomplete"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let patterns = vec![
            CoercionPattern::transform("dup", CoercionCategory::Urgency, "x", "", ""),
            CoercionPattern::transform("dup", CoercionCategory::Urgency, "y", "", ""),
        ];
        let err = PatternLibrarySnapshot::from_patterns("1.0.0", patterns).unwrap_err();
        assert!(matches!(err, FilterError::DuplicatePattern(id) if id == "dup"));
    }

    #[test]
    fn test_empty_version_rejected() {
        let err = PatternLibrarySnapshot::from_patterns("  ", default_patterns()).unwrap_err();
        assert!(matches!(err, FilterError::EmptyLibraryVersion));
    }

    #[test]
    fn test_case_sensitivity_flag() {
        let patterns = vec![
            CoercionPattern::transform("ci", CoercionCategory::Urgency, "urgent", "", ""),
            CoercionPattern::transform("cs", CoercionCategory::Urgency, "ASAP", "", "").case_sensitive(),
        ];
        let snapshot = PatternLibrarySnapshot::from_patterns("1.0.0", patterns).unwrap();
        let ci = snapshot.transforming()[0].matcher().unwrap();
        let cs = snapshot.transforming()[1].matcher().unwrap();
        assert!(ci.is_match("URGENT"));
        assert!(cs.is_match("ASAP"));
        assert!(!cs.is_match("asap"));
    }

    #[test]
    fn test_replace_keeps_old_snapshot_alive() {
        let library = StaticPatternLibrary::with_defaults().unwrap();
        let held = library.snapshot();

        let previous = library.replace(PatternLibrarySnapshot::from_patterns("2.0.0", Vec::new()).unwrap());

        assert_eq!(held.version().semver, DEFAULT_LIBRARY_VERSION);
        assert_eq!(previous.version(), held.version());
        assert_eq!(library.snapshot().version().semver, "2.0.0");
        assert_eq!(library.snapshot().version().rule_count, 0);
    }
}
