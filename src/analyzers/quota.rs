use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::InstanceApi;
use crate::models::ComponentType;

const CRITICAL_THRESHOLD: f64 = 98.0;
const WARNING_THRESHOLD: f64 = 80.0;

/// Compares service quota limits against current consumption and bands each
/// quota by utilization.
pub struct QuotaAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl QuotaAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }

    fn band(percentage: f64) -> &'static str {
        if percentage >= CRITICAL_THRESHOLD {
            "critical"
        } else if percentage >= WARNING_THRESHOLD {
            "warning"
        } else {
            "normal"
        }
    }
}

#[async_trait]
impl Analyzer for QuotaAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Quota
    }

    async fn analyze(&self, _ctx: &AnalyzerContext) -> Result<Value> {
        let quotas = self.api.service_quotas().await?;

        let mut entries = Vec::with_capacity(quotas.len());
        let mut critical = 0u32;
        let mut warning = 0u32;
        let mut normal = 0u32;

        for quota in &quotas {
            // A zero limit cannot be utilized; report it as 0% rather than
            // dividing by it.
            let percentage = if quota.limit > 0 {
                quota.current as f64 / quota.limit as f64 * 100.0
            } else {
                0.0
            };
            let percentage = (percentage * 100.0).round() / 100.0;

            let status = Self::band(percentage);
            match status {
                "critical" => critical += 1,
                "warning" => warning += 1,
                _ => normal += 1,
            }

            debug!(
                quota = %quota.name,
                current = quota.current,
                limit = quota.limit,
                percentage,
                "quota utilization"
            );

            entries.push(json!({
                "name": quota.name,
                "limit": quota.limit,
                "current": quota.current,
                "percentage": percentage,
                "status": status,
            }));
        }

        Ok(json!({
            "quotas": entries,
            "summary": {
                "total_analyzed": quotas.len(),
                "critical": critical,
                "warning": warning,
                "normal": normal,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{test_context, StubApi};
    use crate::instance::api::ServiceQuota;

    fn quota(name: &str, limit: u64, current: u64) -> ServiceQuota {
        ServiceQuota {
            name: name.to_string(),
            limit,
            current,
        }
    }

    #[tokio::test]
    async fn test_utilization_banding() {
        let api = Arc::new(StubApi {
            quotas: vec![
                quota("Users per instance", 100, 99),
                quota("Queues per instance", 100, 85),
                quota("Flows per instance", 100, 10),
            ],
            ..Default::default()
        });
        let analyzer = QuotaAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["summary"]["total_analyzed"], 3);
        assert_eq!(result["summary"]["critical"], 1);
        assert_eq!(result["summary"]["warning"], 1);
        assert_eq!(result["summary"]["normal"], 1);
        assert_eq!(result["quotas"][0]["status"], "critical");
        assert_eq!(result["quotas"][1]["status"], "warning");
        assert_eq!(result["quotas"][2]["status"], "normal");
    }

    #[tokio::test]
    async fn test_exact_thresholds() {
        let api = Arc::new(StubApi {
            quotas: vec![
                quota("a", 100, 98),
                quota("b", 100, 80),
                quota("c", 100, 79),
            ],
            ..Default::default()
        });
        let analyzer = QuotaAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["quotas"][0]["status"], "critical");
        assert_eq!(result["quotas"][1]["status"], "warning");
        assert_eq!(result["quotas"][2]["status"], "normal");
    }

    #[tokio::test]
    async fn test_zero_limit_reports_zero_percent() {
        let api = Arc::new(StubApi {
            quotas: vec![quota("Lex bots per instance", 0, 0)],
            ..Default::default()
        });
        let analyzer = QuotaAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["quotas"][0]["percentage"], 0.0);
        assert_eq!(result["quotas"][0]["status"], "normal");
    }

    #[tokio::test]
    async fn test_empty_quota_list() {
        let api = Arc::new(StubApi::default());
        let analyzer = QuotaAnalyzer::new(api);

        let result = analyzer.analyze(&test_context()).await.unwrap();

        assert_eq!(result["summary"]["total_analyzed"], 0);
        assert!(result["quotas"].as_array().unwrap().is_empty());
    }
}
