use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::InstanceApi;
use crate::models::ComponentType;

const THROTTLE_ERROR_CODE: &str = "TooManyRequestsException";

/// Scans control-plane API events for throttling rejections in the instance's
/// region and aggregates them by operation name.
pub struct ThrottleAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl ThrottleAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Analyzer for ThrottleAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Api
    }

    async fn analyze(&self, ctx: &AnalyzerContext) -> Result<Value> {
        let events = self.api.api_events(&ctx.window).await?;
        debug!(events = events.len(), "fetched api events");

        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        let mut total_throttled = 0u64;

        for event in &events {
            let throttled = event.error_code.as_deref() == Some(THROTTLE_ERROR_CODE)
                && event.region == ctx.instance.region;
            if throttled {
                *counts.entry(&event.event_name).or_default() += 1;
                total_throttled += 1;
            }
        }

        // Worst-hit operations first.
        let mut throttle_list: Vec<(&str, u64)> = counts.into_iter().collect();
        throttle_list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let throttled_by_api: Vec<Value> = throttle_list
            .into_iter()
            .map(|(event_name, count)| json!({"event_name": event_name, "count": count}))
            .collect();

        Ok(json!({
            "total_events_analyzed": events.len(),
            "total_throttled": total_throttled,
            "throttled_by_api": throttled_by_api,
            "region": ctx.instance.region,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{test_context, StubApi};
    use crate::instance::api::ApiEvent;
    use chrono::Utc;

    fn event(name: &str, region: &str, error_code: Option<&str>) -> ApiEvent {
        ApiEvent {
            event_name: name.to_string(),
            event_time: Utc::now(),
            region: region.to_string(),
            error_code: error_code.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_throttles_counted_by_operation() {
        let api = Arc::new(StubApi {
            events: vec![
                event("ListUsers", "us-west-2", Some("TooManyRequestsException")),
                event("ListUsers", "us-west-2", Some("TooManyRequestsException")),
                event("DescribeInstance", "us-west-2", Some("TooManyRequestsException")),
                event("ListQueues", "us-west-2", None),
            ],
            ..Default::default()
        });
        let analyzer = ThrottleAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["total_events_analyzed"], 4);
        assert_eq!(result["total_throttled"], 3);
        assert_eq!(result["throttled_by_api"][0]["event_name"], "ListUsers");
        assert_eq!(result["throttled_by_api"][0]["count"], 2);
    }

    #[tokio::test]
    async fn test_other_regions_and_errors_excluded() {
        let api = Arc::new(StubApi {
            events: vec![
                event("ListUsers", "eu-west-1", Some("TooManyRequestsException")),
                event("ListUsers", "us-west-2", Some("AccessDeniedException")),
            ],
            ..Default::default()
        });
        let analyzer = ThrottleAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["total_events_analyzed"], 2);
        assert_eq!(result["total_throttled"], 0);
        assert!(result["throttled_by_api"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_events() {
        let api = Arc::new(StubApi::default());
        let analyzer = ThrottleAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["total_events_analyzed"], 0);
        assert_eq!(result["total_throttled"], 0);
    }
}
