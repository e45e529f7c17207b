use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::InstanceApi;
use crate::models::ComponentType;

/// Inventories contact flows and measures logging compliance: a flow without
/// logging enabled cannot be diagnosed after the fact.
pub struct FlowAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl FlowAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Analyzer for FlowAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Flow
    }

    async fn analyze(&self, _ctx: &AnalyzerContext) -> Result<Value> {
        let flows = self.api.flows().await?;
        let total = flows.len();
        debug!(total, "fetched contact flows");

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        let mut without_logging = Vec::new();

        for flow in &flows {
            *by_type.entry(&flow.flow_type).or_default() += 1;

            if !flow.logging_enabled {
                without_logging.push(json!({
                    "id": flow.id,
                    "name": flow.name,
                    "type": flow.flow_type,
                    "state": flow.state,
                }));
            }
        }

        let compliant = total - without_logging.len();
        let compliance = if total > 0 {
            (compliant as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Ok(json!({
            "total_flows": total,
            "flows_by_type": by_type,
            "flows_without_logging": without_logging,
            "flows_without_logging_count": total - compliant,
            "logging_compliance_percentage": compliance,
        }))
    }
}
