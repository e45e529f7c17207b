use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// One analysis domain of the review. The set is closed: every review run
/// expects exactly these components and the storage key space is partitioned
/// by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Quota,
    Metrics,
    Phone,
    Flow,
    Api,
    Logs,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Quota,
        ComponentType::Metrics,
        ComponentType::Phone,
        ComponentType::Flow,
        ComponentType::Api,
        ComponentType::Logs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Quota => "quota",
            ComponentType::Metrics => "metrics",
            ComponentType::Phone => "phone",
            ComponentType::Flow => "flow",
            ComponentType::Api => "api",
            ComponentType::Logs => "logs",
        }
    }

    pub fn parse(s: &str) -> Option<ComponentType> {
        match s {
            "quota" => Some(ComponentType::Quota),
            "metrics" => Some(ComponentType::Metrics),
            "phone" => Some(ComponentType::Phone),
            "flow" => Some(ComponentType::Flow),
            "api" => Some(ComponentType::Api),
            "logs" => Some(ComponentType::Logs),
            _ => None,
        }
    }

    /// Human-readable section title used by report formatters.
    pub fn title(&self) -> &'static str {
        match self {
            ComponentType::Quota => "Service Quotas",
            ComponentType::Metrics => "Operational Metrics",
            ComponentType::Phone => "Phone Number Inventory",
            ComponentType::Flow => "Flow Configuration",
            ComponentType::Api => "API Throttling",
            ComponentType::Logs => "Flow Log Errors",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal (or pending) state of one analyzer within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerStatus {
    Pending,
    Succeeded,
    Failed,
    TimedOut,
}

impl AnalyzerStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalyzerStatus::Pending)
    }
}

impl fmt::Display for AnalyzerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalyzerStatus::Pending => "pending",
            AnalyzerStatus::Succeeded => "succeeded",
            AnalyzerStatus::Failed => "failed",
            AnalyzerStatus::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a review run. `Resolved` is terminal: the status map accepts
/// no further writes once it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Created,
    Dispatching,
    AwaitingResults,
    Resolved,
}

/// The time window a review covers, derived from a days-back parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReviewWindow {
    pub fn last_days(days_back: u32) -> Self {
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days_back));
        Self { start, end }
    }
}

/// State of a single orchestration cycle. Created by the orchestrator at
/// invocation start and mutated only by its completion loop; it is never
/// persisted beyond the run, except implicitly through the result records the
/// analyzers write.
#[derive(Debug, Clone)]
pub struct ReviewRun {
    review_id: String,
    window: ReviewWindow,
    created_at: DateTime<Utc>,
    statuses: HashMap<ComponentType, AnalyzerStatus>,
    state: ReviewState,
}

impl ReviewRun {
    pub fn new(review_id: impl Into<String>, window: ReviewWindow, expected: &[ComponentType]) -> Self {
        let statuses = expected
            .iter()
            .map(|c| (*c, AnalyzerStatus::Pending))
            .collect();

        Self {
            review_id: review_id.into(),
            window,
            created_at: Utc::now(),
            statuses,
            state: ReviewState::Created,
        }
    }

    pub fn review_id(&self) -> &str {
        &self.review_id
    }

    pub fn window(&self) -> ReviewWindow {
        self.window
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn statuses(&self) -> &HashMap<ComponentType, AnalyzerStatus> {
        &self.statuses
    }

    pub fn status_of(&self, component: ComponentType) -> Option<AnalyzerStatus> {
        self.statuses.get(&component).copied()
    }

    /// Expected components in their canonical order.
    pub fn expected(&self) -> Vec<ComponentType> {
        ComponentType::ALL
            .iter()
            .copied()
            .filter(|c| self.statuses.contains_key(c))
            .collect()
    }

    pub fn begin_dispatch(&mut self) {
        debug_assert_eq!(self.state, ReviewState::Created);
        self.state = ReviewState::Dispatching;
    }

    pub fn begin_awaiting(&mut self) {
        debug_assert_eq!(self.state, ReviewState::Dispatching);
        self.state = ReviewState::AwaitingResults;
    }

    /// Records a terminal outcome for one analyzer. Returns false (and logs)
    /// when the run has already resolved or the component was never expected;
    /// late completions are discarded for orchestration purposes even though
    /// their storage write may still land.
    pub fn record_outcome(&mut self, component: ComponentType, status: AnalyzerStatus) -> bool {
        if self.state == ReviewState::Resolved {
            warn!(
                review_id = %self.review_id,
                component = %component,
                status = %status,
                "discarding analyzer outcome for already-resolved run"
            );
            return false;
        }

        match self.statuses.get_mut(&component) {
            Some(slot) => {
                *slot = status;
                true
            }
            None => {
                warn!(
                    review_id = %self.review_id,
                    component = %component,
                    "outcome for unexpected component ignored"
                );
                false
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state == ReviewState::Resolved
    }

    /// True once every expected analyzer has a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.statuses.values().all(AnalyzerStatus::is_terminal)
    }

    /// Transitions the run to its terminal state. Any analyzer still pending
    /// is marked timed-out; the run proceeds regardless of how many succeeded.
    pub fn resolve(&mut self) {
        for status in self.statuses.values_mut() {
            if *status == AnalyzerStatus::Pending {
                *status = AnalyzerStatus::TimedOut;
            }
        }
        self.state = ReviewState::Resolved;
    }

    pub fn succeeded_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| **s == AnalyzerStatus::Succeeded)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| matches!(s, AnalyzerStatus::Failed | AnalyzerStatus::TimedOut))
            .count()
    }
}

/// One persisted analysis result. Written exactly once per (review, component)
/// pair; a re-run creates a new review id rather than updating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub review_id: String,
    pub component_type: ComponentType,
    pub data: serde_json::Value,
    /// Absolute time after which the record is no longer guaranteed
    /// retrievable. Deletion itself is backend-native and best-effort.
    pub expires_at: DateTime<Utc>,
}

/// Generates a review identifier: a UTC timestamp prefix (sortable, matches
/// the storage key layout) plus a random suffix so rapid repeated invocations
/// within the same second cannot collide.
pub fn generate_review_id() -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", stamp, &suffix[..8])
}

/// Expiry marker for a record written at `written_at` under the given
/// retention window.
pub fn expiry_timestamp(written_at: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    written_at + Duration::days(retention_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_component_type_round_trip() {
        for component in ComponentType::ALL {
            assert_eq!(ComponentType::parse(component.as_str()), Some(component));
        }
        assert_eq!(ComponentType::parse("STATUS"), None);
    }

    #[test]
    fn test_review_window_span() {
        let window = ReviewWindow::last_days(7);
        let span = window.end - window.start;
        assert_eq!(span.num_days(), 7);
    }

    #[test]
    fn test_review_id_unique_across_rapid_invocations() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_review_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_review_id_shape() {
        let id = generate_review_id();
        // YYYYMMDD-HHMMSS-xxxxxxxx
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_expiry_marker_arithmetic() {
        let written = Utc::now();
        let expires = expiry_timestamp(written, 90);
        assert_eq!((expires - written).num_days(), 90);
    }

    #[test]
    fn test_run_resolution_marks_pending_as_timed_out() {
        let mut run = ReviewRun::new("r1", ReviewWindow::last_days(7), &ComponentType::ALL);
        run.begin_dispatch();
        run.begin_awaiting();

        assert!(run.record_outcome(ComponentType::Quota, AnalyzerStatus::Succeeded));
        assert!(run.record_outcome(ComponentType::Phone, AnalyzerStatus::Failed));
        assert!(!run.all_terminal());

        run.resolve();
        assert!(run.is_resolved());
        assert_eq!(run.status_of(ComponentType::Quota), Some(AnalyzerStatus::Succeeded));
        assert_eq!(run.status_of(ComponentType::Phone), Some(AnalyzerStatus::Failed));
        assert_eq!(run.status_of(ComponentType::Metrics), Some(AnalyzerStatus::TimedOut));
        assert_eq!(run.statuses().len(), ComponentType::ALL.len());
    }

    #[test]
    fn test_late_outcome_discarded_after_resolution() {
        let mut run = ReviewRun::new("r1", ReviewWindow::last_days(1), &ComponentType::ALL);
        run.begin_dispatch();
        run.begin_awaiting();
        run.resolve();

        assert!(!run.record_outcome(ComponentType::Logs, AnalyzerStatus::Succeeded));
        assert_eq!(run.status_of(ComponentType::Logs), Some(AnalyzerStatus::TimedOut));
    }

    #[test]
    fn test_unexpected_component_ignored() {
        let mut run = ReviewRun::new(
            "r1",
            ReviewWindow::last_days(1),
            &[ComponentType::Quota, ComponentType::Phone],
        );
        run.begin_dispatch();
        run.begin_awaiting();

        assert!(!run.record_outcome(ComponentType::Logs, AnalyzerStatus::Succeeded));
        assert_eq!(run.statuses().len(), 2);
    }
}
