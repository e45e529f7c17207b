use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, error, info};

use super::backends::{self, BackendType, Consistency, StorageBackend, StorageSettings};
use crate::models::review::expiry_timestamp;
use crate::models::{ComponentType, ResultRecord};

/// Front door to the configured storage backend. Owns the retention policy:
/// every write gets its expiry marker stamped here, so the two adapters stay
/// symmetrical.
pub struct ResultStore {
    backend: Box<dyn StorageBackend>,
    retention_days: i64,
}

impl ResultStore {
    pub fn new(backend: Box<dyn StorageBackend>, retention_days: i64) -> Self {
        Self {
            backend,
            retention_days,
        }
    }

    /// Builds the store from settings, selecting the backend exactly once.
    pub async fn from_settings(settings: &StorageSettings) -> Result<Self> {
        let backend = backends::create_backend(settings).await?;
        info!(
            backend = %backend.backend_type(),
            retention_days = settings.retention_days,
            "storage backend ready"
        );
        Ok(Self::new(backend, settings.retention_days))
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    pub fn consistency(&self) -> Consistency {
        self.backend.consistency()
    }

    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// Persists one analysis result under (review_id, component). The expiry
    /// marker is write time plus the retention window.
    pub async fn put(
        &self,
        review_id: &str,
        component: ComponentType,
        data: serde_json::Value,
    ) -> Result<()> {
        let record = ResultRecord {
            review_id: review_id.to_string(),
            component_type: component,
            data,
            expires_at: expiry_timestamp(Utc::now(), self.retention_days),
        };

        match self.backend.put(&record).await {
            Ok(()) => {
                debug!(review_id, component = %component, "stored analysis result");
                Ok(())
            }
            Err(e) => {
                error!(review_id, component = %component, error = %e, "failed to store analysis result");
                Err(e)
            }
        }
    }

    pub async fn get(
        &self,
        review_id: &str,
        component: ComponentType,
    ) -> Result<Option<serde_json::Value>> {
        let result = self.backend.get(review_id, component).await;
        if let Err(ref e) = result {
            error!(review_id, component = %component, error = %e, "failed to read analysis result");
        }
        result
    }

    /// All results currently visible for the review. Gaps are for the caller
    /// to interpret; under the object-store backend a very recent write may
    /// not be listed yet.
    pub async fn get_all(
        &self,
        review_id: &str,
    ) -> Result<HashMap<ComponentType, serde_json::Value>> {
        match self.backend.get_all(review_id).await {
            Ok(results) => {
                info!(review_id, count = results.len(), "retrieved review results");
                Ok(results)
            }
            Err(e) => {
                error!(review_id, error = %e, "failed to retrieve review results");
                Err(e)
            }
        }
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
