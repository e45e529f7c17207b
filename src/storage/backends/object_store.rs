use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{BackendType, Consistency, StorageBackend};
use crate::models::{ComponentType, ResultRecord};

/// Object-store adapter. Results live as JSON objects under
/// `reviews/<review_id>/<component>.json` below the bucket root; expiry is
/// handled by the bucket's lifecycle policy, never by this adapter.
pub struct ObjectStoreBackend {
    root: PathBuf,
}

/// On-disk object body. The envelope repeats the key fields so an object is
/// self-describing when read outside this crate.
#[derive(Debug, Serialize, Deserialize)]
struct ObjectEnvelope {
    review_id: String,
    component_type: ComponentType,
    data: serde_json::Value,
    expires_at: DateTime<Utc>,
}

impl ObjectStoreBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn review_prefix(&self, review_id: &str) -> PathBuf {
        self.root.join("reviews").join(review_id)
    }

    fn object_key(&self, review_id: &str, component: ComponentType) -> PathBuf {
        self.review_prefix(review_id)
            .join(format!("{component}.json"))
    }

    async fn read_envelope(path: &Path) -> Result<Option<ObjectEnvelope>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let envelope: ObjectEnvelope = serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt object at {}", path.display()))?;
                Ok(Some(envelope))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::ObjectStore
    }

    fn consistency(&self) -> Consistency {
        // A concurrent prefix listing may not yet observe a fresh object.
        Consistency::EventualList
    }

    async fn put(&self, record: &ResultRecord) -> Result<()> {
        let key = self.object_key(&record.review_id, record.component_type);
        let prefix = self.review_prefix(&record.review_id);

        tokio::fs::create_dir_all(&prefix)
            .await
            .with_context(|| format!("failed to create prefix {}", prefix.display()))?;

        let envelope = ObjectEnvelope {
            review_id: record.review_id.clone(),
            component_type: record.component_type,
            data: record.data.clone(),
            expires_at: record.expires_at,
        };
        let body = serde_json::to_vec_pretty(&envelope).context("failed to serialize result")?;

        // Write-then-rename so a same-key overwrite replaces the object
        // atomically instead of exposing a partial body.
        let tmp = key.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &key)
            .await
            .with_context(|| format!("failed to publish {}", key.display()))?;

        debug!(
            review_id = %record.review_id,
            component = %record.component_type,
            key = %key.display(),
            "stored result object"
        );
        Ok(())
    }

    async fn get(
        &self,
        review_id: &str,
        component: ComponentType,
    ) -> Result<Option<serde_json::Value>> {
        let key = self.object_key(review_id, component);
        Ok(Self::read_envelope(&key).await?.map(|e| e.data))
    }

    async fn get_all(&self, review_id: &str) -> Result<HashMap<ComponentType, serde_json::Value>> {
        let prefix = self.review_prefix(review_id);
        let mut results = HashMap::new();

        let mut entries = match tokio::fs::read_dir(&prefix).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to list {}", prefix.display()))
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to list {}", prefix.display()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let component = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(ComponentType::parse);
            let Some(component) = component else {
                warn!(key = %path.display(), "skipping object with unknown component key");
                continue;
            };

            // A listing returns whatever subset is readable; one corrupt
            // object must not hide the rest. Point lookups still surface it.
            match Self::read_envelope(&path).await {
                Ok(Some(envelope)) => {
                    results.insert(component, envelope.data);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %path.display(), error = %format!("{e:#}"), "skipping unreadable result object");
                }
            }
        }

        debug!(review_id, count = results.len(), "listed result objects");
        Ok(results)
    }

    async fn health_check(&self) -> Result<bool> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("bucket root {} is not writable", self.root.display()))?;
        Ok(true)
    }
}
