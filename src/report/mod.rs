use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::models::{AnalyzerStatus, ComponentType, ReviewWindow};
use crate::orchestrator::ReviewOutcome;

pub mod formatters;

pub use formatters::{JsonFormatter, MarkdownFormatter, ReportFormatter};

/// Report settings, loaded from the `[report]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub format: ReportFormat,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./reports"),
            format: ReportFormat::Markdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn formatter(&self) -> Box<dyn ReportFormatter> {
        match self {
            ReportFormat::Markdown => Box::new(MarkdownFormatter::new()),
            ReportFormat::Json => Box::new(JsonFormatter::new()),
        }
    }
}

/// One component's slot in the report. `data` is `None` whenever the analyzer
/// did not deliver a result; the status says why.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub component: ComponentType,
    pub status: AnalyzerStatus,
    pub data: Option<serde_json::Value>,
}

impl ReportSection {
    pub fn is_available(&self) -> bool {
        self.data.is_some()
    }
}

/// The assembled review report. Always complete: every expected component has
/// a section, in the canonical component order, whether or not its analyzer
/// delivered.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub review_id: String,
    pub generated_at: DateTime<Utc>,
    pub window: ReviewWindow,
    pub sections: Vec<ReportSection>,
}

impl ReviewReport {
    pub fn from_outcome(outcome: &ReviewOutcome) -> Self {
        let sections = outcome
            .run
            .expected()
            .into_iter()
            .map(|component| ReportSection {
                component,
                status: outcome
                    .run
                    .status_of(component)
                    .unwrap_or(AnalyzerStatus::Pending),
                data: outcome.results.get(&component).cloned(),
            })
            .collect();

        Self {
            review_id: outcome.run.review_id().to_string(),
            generated_at: Utc::now(),
            window: outcome.run.window(),
            sections,
        }
    }

    pub fn available_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_available()).count()
    }
}

/// The written report: where it landed, for which review.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub review_id: String,
    pub location: PathBuf,
}

/// Final stage of a review: turns a resolved outcome into a durable report
/// artifact. Must succeed for any subset of delivered components.
#[async_trait]
pub trait ReportAssembler: Send + Sync {
    async fn assemble(&self, outcome: &ReviewOutcome) -> Result<ReportArtifact>;
}

/// Assembler that renders through a formatter and writes the report to a file
/// named after the review id.
pub struct FileReportAssembler {
    output_dir: PathBuf,
    formatter: Box<dyn ReportFormatter>,
}

impl FileReportAssembler {
    pub fn new(output_dir: PathBuf, formatter: Box<dyn ReportFormatter>) -> Self {
        Self {
            output_dir,
            formatter,
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(settings.output_dir.clone(), settings.format.formatter())
    }
}

#[async_trait]
impl ReportAssembler for FileReportAssembler {
    async fn assemble(&self, outcome: &ReviewOutcome) -> Result<ReportArtifact> {
        let report = ReviewReport::from_outcome(outcome);
        let rendered = self.formatter.format(&report).await?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;

        let location = self.output_dir.join(format!(
            "review-{}.{}",
            report.review_id,
            self.formatter.file_extension()
        ));
        tokio::fs::write(&location, rendered)
            .await
            .with_context(|| format!("failed to write {}", location.display()))?;

        info!(
            review_id = %report.review_id,
            location = %location.display(),
            available = report.available_count(),
            sections = report.sections.len(),
            "report written"
        );

        Ok(ReportArtifact {
            review_id: report.review_id,
            location,
        })
    }
}
