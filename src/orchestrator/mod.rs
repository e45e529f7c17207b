use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{error, info, warn};

use crate::analyzers::{run_analyzer, Analyzer, AnalyzerContext};
use crate::infrastructure::error::ReviewError;
use crate::instance::InstanceContext;
use crate::models::review::generate_review_id;
use crate::models::{AnalyzerStatus, ComponentType, ReviewRun, ReviewWindow};
use crate::report::{ReportArtifact, ReportAssembler};
use crate::storage::ResultStore;

/// Orchestrator settings, loaded from the `[orchestrator]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on the review window, in days.
    pub max_days_back: u32,
    /// Wall-clock budget for one review run, in seconds. Analyzers still
    /// pending at the deadline are marked timed out.
    pub run_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_days_back: 90,
            run_timeout_seconds: 300,
        }
    }
}

/// Drives a review run end to end: fan-out dispatch, fan-in completion
/// tracking, and result collection after resolution.
pub struct Orchestrator {
    store: Arc<ResultStore>,
    analyzers: Vec<Arc<dyn Analyzer>>,
    instance: InstanceContext,
    config: OrchestratorConfig,
}

/// A dispatched review. Holds the run record and the in-flight analyzer tasks;
/// consuming it through [`ReviewHandle::wait`] is the only path to resolution.
pub struct ReviewHandle {
    run: ReviewRun,
    tasks: JoinSet<(ComponentType, Result<()>)>,
    /// Task id to component, so a panicked task can still be attributed.
    components: HashMap<tokio::task::Id, ComponentType>,
    deadline: Instant,
}

/// A resolved run together with whatever results storage holds for it.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub run: ReviewRun,
    pub results: HashMap<ComponentType, serde_json::Value>,
}

impl ReviewHandle {
    pub fn review_id(&self) -> &str {
        self.run.review_id()
    }

    /// Drains analyzer completions until every component is terminal or the
    /// run deadline passes. This loop is the single mutation point for the
    /// run's status map, so concurrent completions cannot lose updates.
    ///
    /// On deadline the remaining tasks are detached, not aborted: waiting is
    /// cancelled, analyzer side effects are not, and a late storage write may
    /// still land.
    pub async fn wait(mut self) -> ReviewRun {
        loop {
            let joined = match timeout_at(self.deadline, self.tasks.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        review_id = %self.run.review_id(),
                        "run deadline reached with analyzers still pending"
                    );
                    self.tasks.detach_all();
                    break;
                }
            };

            match joined {
                None => break,
                Some(Ok((component, Ok(())))) => {
                    self.run.record_outcome(component, AnalyzerStatus::Succeeded);
                }
                Some(Ok((component, Err(e)))) => {
                    error!(
                        review_id = %self.run.review_id(),
                        component = %component,
                        error = %format!("{e:#}"),
                        "analyzer failed"
                    );
                    self.run.record_outcome(component, AnalyzerStatus::Failed);
                }
                Some(Err(e)) => {
                    error!(review_id = %self.run.review_id(), error = %e, "analyzer task panicked");
                    if let Some(component) = self.components.get(&e.id()).copied() {
                        self.run.record_outcome(component, AnalyzerStatus::Failed);
                    }
                }
            }
        }

        self.run.resolve();
        info!(
            review_id = %self.run.review_id(),
            succeeded = self.run.succeeded_count(),
            failed = self.run.failed_count(),
            "review resolved"
        );
        self.run
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<ResultStore>,
        analyzers: Vec<Arc<dyn Analyzer>>,
        instance: InstanceContext,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            analyzers,
            instance,
            config,
        }
    }

    fn validate_days_back(&self, days_back: u32) -> Result<(), ReviewError> {
        if days_back == 0 || days_back > self.config.max_days_back {
            return Err(ReviewError::validation(
                format!(
                    "days_back must be between 1 and {}, got {days_back}",
                    self.config.max_days_back
                ),
                Some("days_back".to_string()),
            ));
        }
        Ok(())
    }

    /// Validates the window, dispatches every analyzer as its own task, and
    /// returns immediately with the handle. Rejection happens before the
    /// review id is generated, so a failed start leaves no trace.
    pub fn start_review(&self, days_back: u32) -> Result<ReviewHandle, ReviewError> {
        self.validate_days_back(days_back)?;

        let review_id = generate_review_id();
        let window = ReviewWindow::last_days(days_back);
        let expected: Vec<ComponentType> =
            self.analyzers.iter().map(|a| a.component_type()).collect();

        let mut run = ReviewRun::new(review_id.clone(), window, &expected);
        run.begin_dispatch();

        info!(
            review_id = %review_id,
            days_back,
            analyzers = self.analyzers.len(),
            "starting review"
        );

        let mut tasks = JoinSet::new();
        let mut components = HashMap::new();
        for analyzer in &self.analyzers {
            let analyzer = analyzer.clone();
            let store = self.store.clone();
            let component = analyzer.component_type();
            let ctx = AnalyzerContext {
                review_id: review_id.clone(),
                days_back,
                window,
                instance: self.instance.clone(),
            };
            let task = tasks.spawn(async move {
                let result = run_analyzer(analyzer, ctx, store).await;
                (component, result)
            });
            components.insert(task.id(), component);
        }

        run.begin_awaiting();
        let deadline = Instant::now() + Duration::from_secs(self.config.run_timeout_seconds);
        Ok(ReviewHandle {
            run,
            tasks,
            components,
            deadline,
        })
    }

    /// Collects the resolved run's results from storage. Consumes the run, so
    /// a review can only be finalized once.
    pub async fn finalize_review(&self, run: ReviewRun) -> Result<ReviewOutcome> {
        if !run.is_resolved() {
            return Err(ReviewError::validation(
                format!("review {} is not resolved yet", run.review_id()),
                None,
            )
            .into());
        }

        let results = self.store.get_all(run.review_id()).await?;
        info!(
            review_id = %run.review_id(),
            available = results.len(),
            expected = run.expected().len(),
            "finalizing review"
        );
        Ok(ReviewOutcome { run, results })
    }

    /// Full lifecycle: dispatch, await resolution, collect results, and hand
    /// the outcome to the report assembler.
    pub async fn run_review(
        &self,
        days_back: u32,
        assembler: &dyn ReportAssembler,
    ) -> Result<(ReviewOutcome, ReportArtifact)> {
        let handle = self.start_review(days_back)?;
        let run = handle.wait().await;
        let outcome = self.finalize_review(run).await?;
        let artifact = assembler.assemble(&outcome).await?;
        Ok((outcome, artifact))
    }
}
