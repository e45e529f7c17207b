use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::{InstanceApi, MetricSample};
use crate::models::ComponentType;

/// Metric name on the wire paired with its key in the result document.
const TRACKED_METRICS: [(&str, &str); 3] = [
    ("ConcurrentCalls", "concurrent_calls"),
    ("MissedCalls", "missed_calls"),
    ("ThrottledCalls", "throttled_calls"),
];

/// Summarizes operational telemetry over the review window: the average of
/// per-period averages and the absolute peak across all periods.
pub struct MetricsAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl MetricsAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }

    fn summarize(samples: &[MetricSample]) -> Value {
        if samples.is_empty() {
            return json!({"error": "no data available"});
        }

        let period_average =
            samples.iter().map(|s| s.average).sum::<f64>() / samples.len() as f64;
        let absolute_peak = samples
            .iter()
            .map(|s| s.maximum)
            .fold(f64::NEG_INFINITY, f64::max);

        json!({
            "period_average": (period_average * 100.0).round() / 100.0,
            "absolute_peak": absolute_peak,
            "data_points": samples.len(),
        })
    }
}

#[async_trait]
impl Analyzer for MetricsAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Metrics
    }

    async fn analyze(&self, ctx: &AnalyzerContext) -> Result<Value> {
        let mut result = serde_json::Map::new();

        for (metric, key) in TRACKED_METRICS {
            let samples = self.api.metric_statistics(metric, &ctx.window).await?;
            debug!(metric, samples = samples.len(), "fetched metric statistics");
            result.insert(key.to_string(), Self::summarize(&samples));
        }

        result.insert("days_analyzed".to_string(), json!(ctx.days_back));
        Ok(Value::Object(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{test_context, StubApi};
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample(average: f64, maximum: f64) -> MetricSample {
        MetricSample {
            timestamp: Utc::now(),
            average,
            maximum,
            minimum: 0.0,
        }
    }

    #[tokio::test]
    async fn test_period_average_and_absolute_peak() {
        let mut samples = HashMap::new();
        samples.insert(
            "ConcurrentCalls".to_string(),
            vec![sample(10.0, 40.0), sample(20.0, 25.0), sample(30.0, 35.0)],
        );
        let api = Arc::new(StubApi {
            samples,
            ..Default::default()
        });
        let analyzer = MetricsAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["concurrent_calls"]["period_average"], 20.0);
        assert_eq!(result["concurrent_calls"]["absolute_peak"], 40.0);
        assert_eq!(result["concurrent_calls"]["data_points"], 3);
        assert_eq!(result["days_analyzed"], 7);
    }

    #[tokio::test]
    async fn test_metric_without_data_is_marked() {
        let api = Arc::new(StubApi::default());
        let analyzer = MetricsAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        for key in ["concurrent_calls", "missed_calls", "throttled_calls"] {
            assert_eq!(result[key]["error"], "no data available");
        }
    }

    #[tokio::test]
    async fn test_each_metric_summarized_independently() {
        let mut samples = HashMap::new();
        samples.insert("ThrottledCalls".to_string(), vec![sample(1.0, 5.0)]);
        let api = Arc::new(StubApi {
            samples,
            ..Default::default()
        });
        let analyzer = MetricsAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["throttled_calls"]["absolute_peak"], 5.0);
        assert_eq!(result["concurrent_calls"]["error"], "no data available");
    }
}
