//! Four-stage coercion filter pipeline.
//!
//! ## Stage Order
//!
//! ```text
//!  text ──▶ BLOCK ──▶ REJECT ──▶ TRANSFORM ──▶ VALIDATE ──▶ FilteredContent
//!             │          │                        │
//!             ▼          ▼                        ▼
//!          BLOCKED    REJECTED              REJECTED (timeout)
//! ```
//!
//! The order never varies. Rules within a stage run in snapshot order
//! (severity, category, id), so a fixed input and a fixed library version
//! always produce the same result.
//!
//! ## Failure Policy
//!
//! The pipeline fails closed. A malformed rule, a panic inside a stage, or
//! an overrun of the processing budget yields REJECTED with reason
//! `INTERNAL_FAULT` or `PROCESSING_TIMEOUT`; content is never released on
//! a fault. The budget is measured on the injected monotonic clock after
//! each stage, so a slow scan stops before the next stage starts.
//!
//! ## Audit
//!
//! Every committed decision is appended to the governance ledger and then
//! to the decision log store; the pipeline cannot be built without both.
//! If the store write fails after the ledger append, the entry is held and
//! written ahead of the next decision, so the store catches up without a
//! second ledger event.
//!
//! ## Preview
//!
//! [`CoercionFilter::preview`] runs the same stages but returns plain text,
//! writes no audit entry, and notifies no observer.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use conclave_ledger::{content_hash, record_event, GovernanceLedger, TimeAuthority};
use regex::NoExpand;
use tracing::{debug, error, info, warn};

use crate::content::FilteredContent;
use crate::decision_log::{DecisionLogStore, FilterDecisionLog, FilterObserver};
use crate::library::{CompiledPattern, PatternLibrary, PatternLibrarySnapshot};
use crate::models::{MessageKind, RejectionReason};
use crate::result::{FilterOutcome, FilterPreview, FilterResult, Transformation};
use crate::Result;

/// Filter version stamped into results unless configured otherwise.
pub const DEFAULT_FILTER_VERSION: &str = "coercion-filter/1.0.0";

/// Default processing budget per message.
pub const DEFAULT_PROCESSING_BUDGET: Duration = Duration::from_millis(200);

/// Coercion filter port.
pub trait CoercionFilter: Send + Sync {
    /// Filters `text` and records the decision.
    ///
    /// # Errors
    ///
    /// Only audit failures are errors. When the decision cannot be recorded
    /// no result (and so no [`FilteredContent`]) is returned.
    fn filter(&self, text: &str, kind: MessageKind, submitter_id: &str) -> Result<FilterResult>;

    /// Dry run with identical matching, transform and timeout behavior.
    fn preview(&self, text: &str, kind: MessageKind) -> FilterPreview;
}

enum StageFault {
    Malformed { rule_id: String, detail: String },
    Timeout { stage: &'static str, elapsed: Duration },
}

impl StageFault {
    fn malformed(rule: &CompiledPattern, detail: &str) -> Self {
        StageFault::Malformed {
            rule_id: rule.pattern().id.clone(),
            detail: detail.to_string(),
        }
    }
}

/// Production coercion filter.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conclave_filter::{
///     CoercionFilter, CoercionFilterPipeline, InMemoryDecisionLogStore, MessageKind, StaticPatternLibrary,
/// };
/// use conclave_ledger::{FixedTimeAuthority, InMemoryLedger};
///
/// let store = Arc::new(InMemoryDecisionLogStore::new());
/// let pipeline = CoercionFilterPipeline::new(
///     Arc::new(StaticPatternLibrary::with_defaults().unwrap()),
///     Arc::new(FixedTimeAuthority::default()),
///     store.clone(),
///     Arc::new(InMemoryLedger::new()),
/// );
///
/// let result = pipeline.filter("URGENT please review", MessageKind::Reminder, "clerk").unwrap();
/// assert_eq!(result.content().map(|c| c.as_str()), Some("please review"));
/// assert_eq!(store.len(), 1);
/// ```
pub struct CoercionFilterPipeline {
    library: Arc<dyn PatternLibrary>,
    clock: Arc<dyn TimeAuthority>,
    filter_version: String,
    budget: Duration,
    store: Arc<dyn DecisionLogStore>,
    ledger: Arc<dyn GovernanceLedger>,
    /// Entries on the ledger that the store has not yet accepted.
    unstored: Mutex<VecDeque<FilterDecisionLog>>,
    observers: Vec<Arc<dyn FilterObserver>>,
}

impl CoercionFilterPipeline {
    /// Creates a pipeline with the default version and budget.
    ///
    /// # Arguments
    ///
    /// * `library` - Source of pattern snapshots
    /// * `clock` - Timestamps and the processing budget
    /// * `store` - Decision log store for committed decisions
    /// * `ledger` - Governance ledger receiving each decision event
    pub fn new(
        library: Arc<dyn PatternLibrary>,
        clock: Arc<dyn TimeAuthority>,
        store: Arc<dyn DecisionLogStore>,
        ledger: Arc<dyn GovernanceLedger>,
    ) -> Self {
        Self {
            library,
            clock,
            filter_version: DEFAULT_FILTER_VERSION.to_string(),
            budget: DEFAULT_PROCESSING_BUDGET,
            store,
            ledger,
            unstored: Mutex::new(VecDeque::new()),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter_version(mut self, version: impl Into<String>) -> Self {
        self.filter_version = version.into();
        self
    }

    #[must_use]
    pub fn with_processing_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FilterObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn filter_version(&self) -> &str {
        &self.filter_version
    }

    pub fn processing_budget(&self) -> Duration {
        self.budget
    }

    fn unstored(&self) -> MutexGuard<'_, VecDeque<FilterDecisionLog>> {
        self.unstored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes held entries to the store, oldest first.
    fn store_held(&self) -> Result<()> {
        let mut unstored = self.unstored();
        while let Some(entry) = unstored.front() {
            self.store.append(entry.clone())?;
            debug!("Stored held decision {}", entry.decision_id());
            unstored.pop_front();
        }
        Ok(())
    }

    fn audit(&self, entry: &FilterDecisionLog) -> Result<()> {
        self.store_held()?;
        let sequence = record_event(self.ledger.as_ref(), entry)?;
        if let Err(e) = self.store.append(entry.clone()) {
            warn!(
                "Decision {} is on the ledger (seq {}) but not stored: {}",
                entry.decision_id(),
                sequence,
                e
            );
            self.unstored().push_back(entry.clone());
            return Err(e);
        }
        debug!("Decision {} written at ledger seq {}", entry.decision_id(), sequence);
        Ok(())
    }

    fn evaluate(&self, text: &str) -> FilterPreview {
        let timestamp = self.clock.now();
        let start = self.clock.monotonic();

        let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
            let snapshot = self.library.snapshot();
            let outcome = self.run_stages(&snapshot, text, start);
            (snapshot.version().clone(), outcome)
        }));

        let (library_version, outcome) = match evaluated {
            Ok((version, Ok(outcome))) => (Some(version), outcome),
            Ok((version, Err(StageFault::Malformed { rule_id, detail }))) => {
                error!("Pattern '{}' is malformed ({}); failing closed", rule_id, detail);
                (Some(version), FilterOutcome::rejected(RejectionReason::InternalFault))
            }
            Ok((version, Err(StageFault::Timeout { stage, elapsed }))) => {
                warn!(
                    "Filter exceeded budget after {} stage ({:?} > {:?})",
                    stage, elapsed, self.budget
                );
                (Some(version), FilterOutcome::rejected(RejectionReason::ProcessingTimeout))
            }
            Err(_) => {
                error!("Filter stage panicked; failing closed");
                (None, FilterOutcome::rejected(RejectionReason::InternalFault))
            }
        };

        FilterResult {
            filter_version: self.filter_version.clone(),
            library_version,
            timestamp,
            outcome,
        }
    }

    fn run_stages(
        &self,
        snapshot: &PatternLibrarySnapshot,
        text: &str,
        start: Instant,
    ) -> std::result::Result<FilterOutcome<String>, StageFault> {
        if let Some((rule_id, detail)) = snapshot.faults().next() {
            return Err(StageFault::Malformed {
                rule_id: rule_id.to_string(),
                detail: detail.to_string(),
            });
        }

        if let Some(rule) = first_match(snapshot.blocking(), text)? {
            let pattern = rule.pattern();
            let violation = pattern
                .violation_type
                .ok_or_else(|| StageFault::malformed(rule, "missing violation type"))?;
            debug!("Block stage matched rule '{}'", pattern.id);
            return Ok(FilterOutcome::Blocked {
                violation,
                details: format!("{} (rule {})", pattern.description, pattern.id),
            });
        }
        self.check_budget(start, "block")?;

        if let Some(rule) = first_match(snapshot.rejecting(), text)? {
            let reason = rule
                .pattern()
                .rejection_reason
                .ok_or_else(|| StageFault::malformed(rule, "missing rejection reason"))?;
            debug!("Reject stage matched rule '{}'", rule.pattern().id);
            return Ok(FilterOutcome::rejected(reason));
        }
        self.check_budget(start, "reject")?;

        let (content, transformations) = apply_transforms(snapshot.transforming(), text)?;
        debug!("Transform stage applied {} substitutions", transformations.len());
        self.check_budget(start, "validate")?;

        Ok(FilterOutcome::Accepted {
            content,
            transformations,
        })
    }

    fn check_budget(&self, start: Instant, stage: &'static str) -> std::result::Result<(), StageFault> {
        let elapsed = self.clock.monotonic().saturating_duration_since(start);
        if elapsed > self.budget {
            Err(StageFault::Timeout { stage, elapsed })
        } else {
            Ok(())
        }
    }
}

impl CoercionFilter for CoercionFilterPipeline {
    fn filter(&self, text: &str, kind: MessageKind, submitter_id: &str) -> Result<FilterResult> {
        let evaluated = self.evaluate(text);
        let original_hash = content_hash(text);
        let filtered_at = evaluated.timestamp;
        let version = evaluated.filter_version.clone();
        let result = evaluated
            .map_content(|content| FilteredContent::new(content, original_hash, version, filtered_at));

        let entry = FilterDecisionLog::from_result(&result, text, kind, submitter_id);
        self.audit(&entry)?;
        info!(
            "Filtered {:?} message from '{}': {} (decision {})",
            kind,
            submitter_id,
            result.decision(),
            entry.decision_id()
        );

        for observer in &self.observers {
            observer.on_decision(&entry);
        }
        Ok(result)
    }

    fn preview(&self, text: &str, _kind: MessageKind) -> FilterPreview {
        self.evaluate(text)
    }
}

fn first_match<'s>(
    rules: &'s [CompiledPattern],
    text: &str,
) -> std::result::Result<Option<&'s CompiledPattern>, StageFault> {
    for rule in rules {
        let regex = rule.matcher().map_err(|e| StageFault::malformed(rule, e))?;
        if regex.is_match(text) {
            return Ok(Some(rule));
        }
    }
    Ok(None)
}

fn apply_transforms(
    rules: &[CompiledPattern],
    text: &str,
) -> std::result::Result<(String, Vec<Transformation>), StageFault> {
    let mut current = text.to_string();
    let mut applied = Vec::new();

    for rule in rules {
        let regex = rule.matcher().map_err(|e| StageFault::malformed(rule, e))?;
        let pattern = rule.pattern();
        let replacement = pattern
            .replacement
            .as_deref()
            .ok_or_else(|| StageFault::malformed(rule, "missing replacement"))?;

        let before = applied.len();
        for m in regex.find_iter(&current) {
            applied.push(Transformation {
                rule_id: pattern.id.clone(),
                matched_pattern: pattern.pattern.clone(),
                original_text: m.as_str().to_string(),
                replacement_text: replacement.to_string(),
                position: current[..m.start()].chars().count(),
            });
        }
        if applied.len() > before {
            current = regex.replace_all(&current, NoExpand(replacement)).into_owned();
        }
    }

    if !applied.is_empty() {
        current = normalize_whitespace(&current);
    }
    Ok((current, applied))
}

/// Collapses runs of spaces and tabs to one space and trims the ends.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_log::{DecisionLogQuery, InMemoryDecisionLogStore};
    use crate::library::StaticPatternLibrary;
    use crate::models::{CoercionCategory, CoercionPattern, ViolationType};
    use crate::result::FilterDecision;
    use conclave_ledger::{EventEnvelope, FixedTimeAuthority, InMemoryLedger, LedgerError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn library(patterns: Vec<CoercionPattern>) -> Arc<StaticPatternLibrary> {
        Arc::new(StaticPatternLibrary::new(
            PatternLibrarySnapshot::from_patterns("1.0.0", patterns).unwrap(),
        ))
    }

    fn scenario_library() -> Arc<StaticPatternLibrary> {
        library(vec![
            CoercionPattern::block("blk", CoercionCategory::Threat, "or else", ViolationType::ExplicitThreat, "ultimatum"),
            CoercionPattern::reject(
                "rej",
                CoercionCategory::Demand,
                "you must",
                RejectionReason::CommandingLanguage,
                "command",
            ),
            CoercionPattern::transform("xfm", CoercionCategory::Urgency, "URGENT", "", "urgency"),
        ])
    }

    fn pipeline_with(lib: Arc<dyn PatternLibrary>, clock: FixedTimeAuthority) -> CoercionFilterPipeline {
        CoercionFilterPipeline::new(
            lib,
            Arc::new(clock),
            Arc::new(InMemoryDecisionLogStore::new()),
            Arc::new(InMemoryLedger::new()),
        )
    }

    fn audited(store: Arc<dyn DecisionLogStore>, ledger: Arc<dyn GovernanceLedger>) -> CoercionFilterPipeline {
        CoercionFilterPipeline::new(scenario_library(), Arc::new(FixedTimeAuthority::default()), store, ledger)
    }

    fn pipeline() -> CoercionFilterPipeline {
        pipeline_with(scenario_library(), FixedTimeAuthority::default())
    }

    #[derive(Default)]
    struct CountingObserver(AtomicUsize);

    impl FilterObserver for CountingObserver {
        fn on_decision(&self, _entry: &FilterDecisionLog) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingLibrary;

    impl PatternLibrary for PanickingLibrary {
        fn snapshot(&self) -> Arc<PatternLibrarySnapshot> {
            panic!("library unavailable")
        }
    }

    /// Refuses the first append, then behaves like the in-memory store.
    #[derive(Default)]
    struct StallingStore {
        inner: InMemoryDecisionLogStore,
        stalled: AtomicBool,
    }

    impl DecisionLogStore for StallingStore {
        fn append(&self, entry: FilterDecisionLog) -> Result<()> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                return Err(crate::FilterError::DecisionStore {
                    decision_id: entry.decision_id(),
                    detail: "store unavailable".to_string(),
                });
            }
            self.inner.append(entry)
        }

        fn query(&self, query: &DecisionLogQuery) -> Result<Vec<FilterDecisionLog>> {
            self.inner.query(query)
        }

        fn get(&self, decision_id: uuid::Uuid) -> Result<Option<FilterDecisionLog>> {
            self.inner.get(decision_id)
        }
    }

    struct ClosedLedger;

    impl GovernanceLedger for ClosedLedger {
        fn append_event(&self, _event: EventEnvelope) -> conclave_ledger::Result<u64> {
            Err(LedgerError::CorruptEntry {
                sequence: 0,
                detail: "ledger closed".to_string(),
            })
        }
    }

    #[test]
    fn test_block_precedes_reject() {
        let result = pipeline()
            .filter("You must comply or else.", MessageKind::Correspondence, "s")
            .unwrap();
        assert_eq!(result.decision(), FilterDecision::Blocked);
        assert_eq!(result.violation(), Some(ViolationType::ExplicitThreat));
        assert!(result.content().is_none());
    }

    #[test]
    fn test_reject_returns_guidance() {
        let result = pipeline().filter("You must reply", MessageKind::Reminder, "s").unwrap();
        assert_eq!(result.rejection_reason(), Some(RejectionReason::CommandingLanguage));
        match &result.outcome {
            FilterOutcome::Rejected { guidance, .. } => assert!(!guidance.is_empty()),
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_records_single_substitution() {
        let result = pipeline()
            .filter("URGENT: please respond", MessageKind::Reminder, "s")
            .unwrap();

        assert_eq!(result.decision(), FilterDecision::Accepted);
        assert_eq!(result.content().map(FilteredContent::as_str), Some(": please respond"));
        let transformations = result.transformations();
        assert_eq!(transformations.len(), 1);
        assert_eq!(transformations[0].rule_id, "xfm");
        assert_eq!(transformations[0].original_text, "URGENT");
        assert_eq!(transformations[0].replacement_text, "");
        assert_eq!(transformations[0].position, 0);
    }

    #[test]
    fn test_refiltering_transformed_output_is_stable() {
        let p = pipeline();
        let first = p.filter("URGENT please review", MessageKind::Reminder, "s").unwrap();
        let first_text = first.content().unwrap().as_str().to_string();
        assert_eq!(first_text, "please review");

        let second = p.filter(&first_text, MessageKind::Reminder, "s").unwrap();
        assert_eq!(second.content().unwrap().as_str(), "please review");
        assert!(second.transformations().is_empty());
    }

    #[test]
    fn test_untransformed_text_is_not_normalized() {
        let result = pipeline().filter("  spaced   out  ", MessageKind::Reminder, "s").unwrap();
        assert_eq!(result.content().unwrap().as_str(), "  spaced   out  ");
    }

    #[test]
    fn test_position_is_character_offset() {
        let result = pipeline().filter("héllo URGENT now", MessageKind::Reminder, "s").unwrap();
        assert_eq!(result.transformations()[0].position, 6);
        assert_eq!(result.content().unwrap().as_str(), "héllo now");
    }

    #[test]
    fn test_filtered_content_carries_provenance() {
        let p = pipeline().with_filter_version("filter-test");
        let result = p.filter("URGENT hi", MessageKind::Reminder, "s").unwrap();
        let content = result.content().unwrap();
        assert_eq!(content.original_hash(), &content_hash("URGENT hi"));
        assert_eq!(content.filter_version(), "filter-test");
        assert_eq!(content.filtered_at(), result.timestamp);
    }

    #[test]
    fn test_malformed_pattern_fails_closed() {
        let lib = library(vec![CoercionPattern::block(
            "bad",
            CoercionCategory::Threat,
            "(unclosed",
            ViolationType::ExplicitThreat,
            "",
        )]);
        let result = pipeline_with(lib, FixedTimeAuthority::default())
            .filter("harmless", MessageKind::Reminder, "s")
            .unwrap();
        assert_eq!(result.rejection_reason(), Some(RejectionReason::InternalFault));
    }

    #[test]
    fn test_panic_fails_closed() {
        let result = pipeline_with(Arc::new(PanickingLibrary), FixedTimeAuthority::default())
            .filter("harmless", MessageKind::Reminder, "s")
            .unwrap();
        assert_eq!(result.rejection_reason(), Some(RejectionReason::InternalFault));
        assert!(result.library_version.is_none());
    }

    #[test]
    fn test_timeout_between_stages() {
        // Each monotonic read advances 150ms: the reject-stage check sees 300ms
        let clock = FixedTimeAuthority::default().with_monotonic_step(Duration::from_millis(150));
        let result = pipeline_with(scenario_library(), clock)
            .filter("URGENT please review", MessageKind::Reminder, "s")
            .unwrap();
        assert_eq!(result.rejection_reason(), Some(RejectionReason::ProcessingTimeout));
        assert!(result.content().is_none());
    }

    #[test]
    fn test_timeout_at_validation_converts_accept() {
        // Reads at 0, 70, 140, 210ms: only the final validation overruns
        let clock = FixedTimeAuthority::default().with_monotonic_step(Duration::from_millis(70));
        let result = pipeline_with(scenario_library(), clock)
            .filter("please review", MessageKind::Reminder, "s")
            .unwrap();
        assert_eq!(result.rejection_reason(), Some(RejectionReason::ProcessingTimeout));
    }

    #[test]
    fn test_block_is_reported_even_when_slow() {
        let clock = FixedTimeAuthority::default().with_monotonic_step(Duration::from_secs(1));
        let result = pipeline_with(scenario_library(), clock)
            .filter("do it or else", MessageKind::Reminder, "s")
            .unwrap();
        assert_eq!(result.decision(), FilterDecision::Blocked);
    }

    #[test]
    fn test_filter_audits_and_notifies() {
        let store = Arc::new(InMemoryDecisionLogStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let observer = Arc::new(CountingObserver::default());
        let p = audited(store.clone(), ledger.clone()).with_observer(observer.clone());

        p.filter("URGENT please review", MessageKind::Reminder, "clerk").unwrap();
        p.filter("or else", MessageKind::Reminder, "clerk").unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(ledger.events_of_type("coercion_filter.decision_logged").len(), 2);
        assert_eq!(observer.0.load(Ordering::SeqCst), 2);

        let blocked = store
            .query(&DecisionLogQuery::new().by_decision(FilterDecision::Blocked))
            .unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].input_hash(), &content_hash("or else"));
        assert!(blocked[0].output_hash().is_none());
    }

    #[test]
    fn test_preview_matches_filter_without_side_effects() {
        let store = Arc::new(InMemoryDecisionLogStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let observer = Arc::new(CountingObserver::default());
        let p = audited(store.clone(), ledger.clone()).with_observer(observer.clone());

        let preview = p.preview("URGENT: please respond", MessageKind::Reminder);
        assert_eq!(preview.content().map(String::as_str), Some(": please respond"));
        assert_eq!(preview.transformations().len(), 1);

        assert!(store.is_empty());
        assert!(ledger.is_empty());
        assert_eq!(observer.0.load(Ordering::SeqCst), 0);

        let committed = p.filter("URGENT: please respond", MessageKind::Reminder, "s").unwrap();
        assert_eq!(
            committed.content().map(FilteredContent::as_str),
            preview.content().map(String::as_str)
        );
        assert_eq!(committed.transformations(), preview.transformations());
    }

    #[test]
    fn test_audit_failure_withholds_result() {
        let store = Arc::new(InMemoryDecisionLogStore::new());
        let p = audited(store.clone(), Arc::new(ClosedLedger));
        let err = p.filter("URGENT hi", MessageKind::Reminder, "s").unwrap_err();
        assert!(matches!(err, crate::FilterError::Ledger(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_failure_is_caught_up_without_second_event() {
        let store = Arc::new(StallingStore::default());
        let ledger = Arc::new(InMemoryLedger::new());
        let p = audited(store.clone(), ledger.clone());

        let err = p.filter("URGENT hi", MessageKind::Reminder, "s").unwrap_err();
        assert!(matches!(err, crate::FilterError::DecisionStore { .. }));
        assert_eq!(ledger.len(), 1);
        assert!(store.inner.is_empty());

        p.filter("please review", MessageKind::Reminder, "s").unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(store.inner.len(), 2);

        let logged: Vec<uuid::Uuid> = ledger.events().iter().map(|e| e.event_id).collect();
        let stored: Vec<uuid::Uuid> = store
            .query(&DecisionLogQuery::new())
            .unwrap()
            .iter()
            .map(FilterDecisionLog::decision_id)
            .collect();
        assert_eq!(logged, stored);
    }

    #[test]
    fn test_deterministic_for_fixed_input() {
        let p = pipeline_with(StaticPatternLibrary::with_defaults().map(Arc::new).unwrap(), FixedTimeAuthority::default());
        let a = p.preview("URGENT!!! reply ASAP", MessageKind::Reminder);
        let b = p.preview("URGENT!!! reply ASAP", MessageKind::Reminder);
        assert_eq!(a, b);
        assert_eq!(a.content().map(String::as_str), Some("! reply when you are able"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \t b  "), "a b");
        assert_eq!(normalize_whitespace("a\nb"), "a\nb");
    }
}
