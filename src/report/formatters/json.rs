use anyhow::{Context, Result};
use async_trait::async_trait;

use super::ReportFormatter;
use crate::report::ReviewReport;

/// JSON formatter. Serializes the full report structure, unavailable sections
/// included, so downstream tooling sees the same shape for every run.
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportFormatter for JsonFormatter {
    async fn format(&self, report: &ReviewReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("failed to serialize report")
    }

    fn name(&self) -> &str {
        "json"
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentType;
    use crate::report::tests::outcome_with;
    use serde_json::json;

    #[tokio::test]
    async fn test_serialized_report_keeps_all_sections() {
        let outcome = outcome_with(
            &ComponentType::ALL,
            &[(ComponentType::Quota, json!({"summary": {"critical": 0}}))],
        );
        let report = ReviewReport::from_outcome(&outcome);

        let rendered = JsonFormatter::new().format(&report).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed["review_id"], "20260101-000000-deadbeef");
        assert_eq!(
            parsed["sections"].as_array().unwrap().len(),
            ComponentType::ALL.len()
        );
        assert_eq!(parsed["sections"][0]["component"], "quota");
        assert!(parsed["sections"][5]["data"].is_null());
    }
}
