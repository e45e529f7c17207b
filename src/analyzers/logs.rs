use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::InstanceApi;
use crate::models::ComponentType;

const SAMPLE_LIMIT: usize = 20;
const MESSAGE_TRUNCATE: usize = 200;

/// Groups flow-log error entries by type and by flow, with a sample of recent
/// messages for triage. Requires the instance to have a flow log group.
pub struct LogAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl LogAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }

    fn truncate(message: &str) -> &str {
        match message.char_indices().nth(MESSAGE_TRUNCATE) {
            Some((idx, _)) => &message[..idx],
            None => message,
        }
    }
}

#[async_trait]
impl Analyzer for LogAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Logs
    }

    async fn analyze(&self, ctx: &AnalyzerContext) -> Result<Value> {
        let Some(log_group) = ctx.instance.log_group.as_deref() else {
            bail!("no flow log group configured for instance {}", ctx.instance.instance_id);
        };

        let mut entries = self.api.log_errors(log_group, &ctx.window).await?;
        debug!(log_group, errors = entries.len(), "fetched flow log errors");

        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_flow: BTreeMap<String, u64> = BTreeMap::new();

        for entry in &entries {
            *by_type.entry(entry.error_type.clone()).or_default() += 1;
            let flow = entry.flow_name.as_deref().unwrap_or("unknown");
            *by_flow.entry(flow.to_string()).or_default() += 1;
        }

        // Most recent first for the triage sample.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let sample_errors: Vec<Value> = entries
            .iter()
            .take(SAMPLE_LIMIT)
            .map(|e| {
                json!({
                    "timestamp": e.timestamp,
                    "flow_name": e.flow_name,
                    "error_type": e.error_type,
                    "message": Self::truncate(&e.message),
                })
            })
            .collect();

        Ok(json!({
            "total_errors": entries.len(),
            "errors_by_type": by_type,
            "errors_by_flow": by_flow,
            "sample_errors": sample_errors,
            "log_group": log_group,
            "days_analyzed": ctx.days_back,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{test_context, StubApi};
    use crate::instance::api::LogError;
    use chrono::{Duration, Utc};

    fn entry(flow: Option<&str>, error_type: &str, message: &str, age_minutes: i64) -> LogError {
        LogError {
            timestamp: Utc::now() - Duration::minutes(age_minutes),
            flow_name: flow.map(str::to_string),
            error_type: error_type.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_errors_grouped_by_type_and_flow() {
        let api = Arc::new(StubApi {
            log_entries: vec![
                entry(Some("Inbound"), "Timeout", "lambda timed out", 5),
                entry(Some("Inbound"), "Timeout", "lambda timed out", 10),
                entry(Some("Outbound"), "Invalid Input", "bad attribute", 1),
                entry(None, "Other", "unclassified", 2),
            ],
            ..Default::default()
        });
        let analyzer = LogAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["total_errors"], 4);
        assert_eq!(result["errors_by_type"]["Timeout"], 2);
        assert_eq!(result["errors_by_flow"]["Inbound"], 2);
        assert_eq!(result["errors_by_flow"]["unknown"], 1);
        // Newest entry leads the sample.
        assert_eq!(result["sample_errors"][0]["error_type"], "Invalid Input");
    }

    #[tokio::test]
    async fn test_long_messages_truncated_in_sample() {
        let long = "x".repeat(500);
        let api = Arc::new(StubApi {
            log_entries: vec![entry(Some("f"), "Other", &long, 0)],
            ..Default::default()
        });
        let analyzer = LogAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        let message = result["sample_errors"][0]["message"].as_str().unwrap();
        assert_eq!(message.len(), 200);
    }

    #[tokio::test]
    async fn test_missing_log_group_is_an_error() {
        let api = Arc::new(StubApi::default());
        let analyzer = LogAnalyzer::new(api);

        let mut ctx = test_context();
        ctx.instance.log_group = None;

        let err = analyzer.analyze(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("no flow log group"));
    }

    #[tokio::test]
    async fn test_no_errors() {
        let api = Arc::new(StubApi::default());
        let analyzer = LogAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["total_errors"], 0);
        assert!(result["sample_errors"].as_array().unwrap().is_empty());
    }
}
