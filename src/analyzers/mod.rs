use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::instance::api::InstanceApi;
use crate::instance::InstanceContext;
use crate::models::{ComponentType, ReviewWindow};
use crate::storage::ResultStore;

pub mod api;
pub mod flow;
pub mod logs;
pub mod metrics;
pub mod phone;
pub mod quota;

pub use api::ThrottleAnalyzer;
pub use flow::FlowAnalyzer;
pub use logs::LogAnalyzer;
pub use metrics::MetricsAnalyzer;
pub use phone::PhoneAnalyzer;
pub use quota::QuotaAnalyzer;

/// Everything an analyzer invocation receives: the review identity, its time
/// window, and the opaque instance context.
#[derive(Debug, Clone)]
pub struct AnalyzerContext {
    pub review_id: String,
    pub days_back: u32,
    pub window: ReviewWindow,
    pub instance: InstanceContext,
}

/// One analysis domain. Implementations produce a single JSON document per
/// run; persistence and completion signaling belong to the invocation layer,
/// not the analyzer body.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn component_type(&self) -> ComponentType;

    async fn analyze(&self, ctx: &AnalyzerContext) -> Result<serde_json::Value>;
}

/// Invocation wrapper: runs the analyzer, writes its result through storage,
/// and only then reports success. A storage-write failure is indistinguishable
/// from an analyzer failure to the orchestrator, by contract. The payload
/// itself travels exclusively through storage.
pub async fn run_analyzer(
    analyzer: Arc<dyn Analyzer>,
    ctx: AnalyzerContext,
    store: Arc<ResultStore>,
) -> Result<()> {
    let component = analyzer.component_type();
    debug!(review_id = %ctx.review_id, component = %component, "starting analysis");

    let data = analyzer
        .analyze(&ctx)
        .await
        .with_context(|| format!("{component} analysis failed"))?;

    store
        .put(&ctx.review_id, component, data)
        .await
        .with_context(|| format!("failed to persist {component} result"))?;

    info!(review_id = %ctx.review_id, component = %component, "analysis completed");
    Ok(())
}

/// The full analyzer set for a standard review, sharing one upstream client.
pub fn default_analyzers(api: Arc<dyn InstanceApi>) -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(QuotaAnalyzer::new(api.clone())),
        Arc::new(MetricsAnalyzer::new(api.clone())),
        Arc::new(PhoneAnalyzer::new(api.clone())),
        Arc::new(FlowAnalyzer::new(api.clone())),
        Arc::new(ThrottleAnalyzer::new(api.clone())),
        Arc::new(LogAnalyzer::new(api)),
    ]
}
