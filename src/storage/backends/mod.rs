use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::{ComponentType, ResultRecord};

pub mod key_value;
pub mod object_store;

pub use key_value::KeyValueBackend;
pub use object_store::ObjectStoreBackend;

/// Concrete backend kinds. Selected once per deployment; records written under
/// one backend are not reachable through the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    ObjectStore,
    KeyValueTable,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::ObjectStore => "object-store",
            BackendType::KeyValueTable => "key-value-table",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The consistency a backend can promise. Callers that read shortly after a
/// write (e.g. report assembly right after a run resolves) must treat brief
/// staleness under `EventualList` as expected, not as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// Point and listing reads observe a completed write immediately.
    ReadAfterWrite,
    /// Point reads are consistent, but a listing from another execution
    /// context may briefly miss a fresh write.
    EventualList,
}

/// Uniform persistence contract over the two concrete backends. Analyzers and
/// the report stage never learn which one is active.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn consistency(&self) -> Consistency;

    /// Writes the record under its composite (review_id, component_type) key,
    /// overwriting any existing record at that key. Serialization errors and
    /// backend rejections surface as errors, never silently.
    async fn put(&self, record: &ResultRecord) -> Result<()>;

    /// Point lookup. Absence is `Ok(None)`, not an error.
    async fn get(
        &self,
        review_id: &str,
        component: ComponentType,
    ) -> Result<Option<serde_json::Value>>;

    /// Returns whatever subset of records currently exists for the review.
    /// A review id with zero writes yields an empty map.
    async fn get_all(&self, review_id: &str) -> Result<HashMap<ComponentType, serde_json::Value>>;

    async fn health_check(&self) -> Result<bool>;
}

/// Storage settings, loaded from the `[storage]` config section. The backend
/// choice is static per deployment; switching it does not migrate records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: BackendType,
    /// Root directory of the object-store bucket.
    pub object_store_root: PathBuf,
    /// Connection string for the key-value table backend.
    pub connection_string: String,
    pub table_name: String,
    /// Days until a written record becomes eligible for backend-native expiry.
    pub retention_days: i64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: BackendType::ObjectStore,
            object_store_root: PathBuf::from("./review-results"),
            connection_string: "sqlite://review-results.db?mode=rwc".to_string(),
            table_name: "review_results".to_string(),
            retention_days: 90,
        }
    }
}

/// Builds the configured backend. This is the single selection point; no call
/// site branches on the backend kind afterwards.
pub async fn create_backend(settings: &StorageSettings) -> Result<Box<dyn StorageBackend>> {
    match settings.backend {
        BackendType::ObjectStore => Ok(Box::new(ObjectStoreBackend::new(
            settings.object_store_root.clone(),
        ))),
        BackendType::KeyValueTable => {
            let backend =
                KeyValueBackend::new(&settings.connection_string, &settings.table_name).await?;
            Ok(Box::new(backend))
        }
    }
}
