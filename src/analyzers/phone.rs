use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Analyzer, AnalyzerContext};
use crate::instance::api::InstanceApi;
use crate::models::ComponentType;

/// Breaks claimed phone numbers down by type, country, and carrier, and scores
/// carrier diversity for resilience.
pub struct PhoneAnalyzer {
    api: Arc<dyn InstanceApi>,
}

impl PhoneAnalyzer {
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self { api }
    }

    fn percentage(count: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (count as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

#[async_trait]
impl Analyzer for PhoneAnalyzer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Phone
    }

    async fn analyze(&self, _ctx: &AnalyzerContext) -> Result<Value> {
        let numbers = self.api.phone_numbers().await?;
        let total = numbers.len();
        debug!(total, "fetched phone numbers");

        if total == 0 {
            return Ok(json!({
                "total_numbers": 0,
                "message": "no phone numbers found",
            }));
        }

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_country: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_carrier: BTreeMap<&str, usize> = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();

        for pn in &numbers {
            *by_type.entry(&pn.number_type).or_default() += 1;
            *by_country.entry(&pn.country).or_default() += 1;
            *by_carrier.entry(&pn.carrier).or_default() += 1;
            groups
                .entry(format!("{}|{}", pn.country, pn.carrier))
                .or_default()
                .push(&pn.number);
        }

        // Largest groups first; the head of the table is where a carrier
        // outage hurts most.
        let mut diversity: Vec<(String, Vec<&str>)> = groups.into_iter().collect();
        diversity.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
        let carrier_diversity: Vec<Value> = diversity
            .into_iter()
            .map(|(key, numbers)| {
                json!({
                    "country_carrier": key,
                    "count": numbers.len(),
                    "numbers": numbers,
                })
            })
            .collect();

        let toll_free = by_type.get("TOLL_FREE").copied().unwrap_or(0);
        let did = by_type.get("DID").copied().unwrap_or(0);
        let toll_free_percentage = Self::percentage(toll_free, total);
        let did_percentage = Self::percentage(did, total);
        let countries_count = by_country.len();
        let carrier_count = by_carrier.len();

        let mut insights: Vec<String> = Vec::new();
        if carrier_count < 2 && total > 1 {
            insights.push(format!(
                "all {total} numbers depend on a single carrier; a carrier outage takes every number down"
            ));
        }
        if toll_free_percentage > 70.0 {
            insights.push(format!(
                "high toll-free usage: {toll_free_percentage}% of numbers are toll-free"
            ));
        }
        if did_percentage > 50.0 {
            insights.push(format!(
                "DID numbers provide local presence: {did_percentage}% of total numbers"
            ));
        }
        if countries_count > 1 {
            insights.push(format!(
                "international presence: numbers in {countries_count} countries"
            ));
        }

        Ok(json!({
            "total_numbers": total,
            "by_type": by_type,
            "by_country": by_country,
            "by_carrier": by_carrier,
            "carrier_diversity": carrier_diversity,
            "carrier_diversity_score": carrier_count,
            "countries_count": countries_count,
            "toll_free_percentage": toll_free_percentage,
            "did_percentage": did_percentage,
            "insights": insights,
        }))
    }
}
