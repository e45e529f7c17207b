use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ReviewWindow;

/// A service quota together with the current resource count it governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceQuota {
    pub name: String,
    pub limit: u64,
    pub current: u64,
}

/// One aggregated datapoint of an operational metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
}

/// A claimed phone number with its carrier validation details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    pub number_type: String,
    pub country: String,
    pub carrier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub id: String,
    pub name: String,
    pub flow_type: String,
    pub state: String,
    pub logging_enabled: bool,
}

/// A control-plane API event within the review window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEvent {
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    pub region: String,
    pub error_code: Option<String>,
}

/// One error entry from the instance's flow logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogError {
    pub timestamp: DateTime<Utc>,
    pub flow_name: Option<String>,
    pub error_type: String,
    pub message: String,
}

/// Read-only seam to the instance's upstream admin and telemetry APIs. Each
/// analyzer pulls through this trait, so analyzer bodies stay pure over the
/// data it returns and tests can substitute fixtures.
#[async_trait]
pub trait InstanceApi: Send + Sync {
    async fn service_quotas(&self) -> Result<Vec<ServiceQuota>>;

    async fn metric_statistics(&self, metric: &str, window: &ReviewWindow)
        -> Result<Vec<MetricSample>>;

    async fn phone_numbers(&self) -> Result<Vec<PhoneNumber>>;

    async fn flows(&self) -> Result<Vec<FlowSummary>>;

    async fn api_events(&self, window: &ReviewWindow) -> Result<Vec<ApiEvent>>;

    async fn log_errors(&self, log_group: &str, window: &ReviewWindow) -> Result<Vec<LogError>>;
}

/// HTTP implementation of [`InstanceApi`] against the deployment's admin API
/// gateway.
pub struct HttpInstanceApi {
    client: reqwest::Client,
    base_url: String,
    instance_id: String,
}

impl HttpInstanceApi {
    pub fn new(base_url: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            instance_id: instance_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/instances/{}/{}", self.base_url, self.instance_id, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("upstream rejected {url}"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("invalid response body from {url}"))
    }

    async fn get_json_windowed<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        window: &ReviewWindow,
    ) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", window.start.to_rfc3339()),
                ("end", window.end.to_rfc3339()),
            ])
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("upstream rejected {url}"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("invalid response body from {url}"))
    }
}

#[async_trait]
impl InstanceApi for HttpInstanceApi {
    async fn service_quotas(&self) -> Result<Vec<ServiceQuota>> {
        self.get_json(self.url("quotas")).await
    }

    async fn metric_statistics(
        &self,
        metric: &str,
        window: &ReviewWindow,
    ) -> Result<Vec<MetricSample>> {
        self.get_json_windowed(self.url(&format!("metrics/{metric}")), window)
            .await
    }

    async fn phone_numbers(&self) -> Result<Vec<PhoneNumber>> {
        self.get_json(self.url("phone-numbers")).await
    }

    async fn flows(&self) -> Result<Vec<FlowSummary>> {
        self.get_json(self.url("flows")).await
    }

    async fn api_events(&self, window: &ReviewWindow) -> Result<Vec<ApiEvent>> {
        self.get_json_windowed(self.url("api-events"), window).await
    }

    async fn log_errors(&self, log_group: &str, window: &ReviewWindow) -> Result<Vec<LogError>> {
        let encoded = log_group.replace('/', "%2F");
        self.get_json_windowed(self.url(&format!("log-errors/{encoded}")), window)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_service_quotas_deserialize() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instances/inst-1/quotas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Users per instance", "limit": 500, "current": 120},
                {"name": "Queues per instance", "limit": 50, "current": 49}
            ])))
            .mount(&server)
            .await;

        let api = HttpInstanceApi::new(server.uri(), "inst-1");
        let quotas = api.service_quotas().await.unwrap();

        assert_eq!(quotas.len(), 2);
        assert_eq!(quotas[0].name, "Users per instance");
        assert_eq!(quotas[1].current, 49);
    }

    #[tokio::test]
    async fn test_windowed_request_carries_range() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instances/inst-1/api-events"))
            .and(wiremock::matchers::query_param_contains("start", "T"))
            .and(wiremock::matchers::query_param_contains("end", "T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let api = HttpInstanceApi::new(server.uri(), "inst-1");
        let window = ReviewWindow::last_days(7);
        let events = api.api_events(&window).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instances/inst-1/flows"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let api = HttpInstanceApi::new(server.uri(), "inst-1");
        let err = api.flows().await.unwrap_err();
        assert!(err.to_string().contains("upstream rejected"));
    }
}
