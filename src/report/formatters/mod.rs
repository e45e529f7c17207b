pub mod json;
pub mod markdown;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;

use anyhow::Result;
use async_trait::async_trait;

use super::ReviewReport;

/// Renders an assembled report into one output format.
#[async_trait]
pub trait ReportFormatter: Send + Sync {
    async fn format(&self, report: &ReviewReport) -> Result<String>;

    fn name(&self) -> &str;

    fn file_extension(&self) -> &str;
}
