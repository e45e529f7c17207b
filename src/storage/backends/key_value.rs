use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{BackendType, Consistency, StorageBackend};
use crate::models::{ComponentType, ResultRecord};

/// Key-value table adapter. One row per (review_id, component_type) with the
/// payload as a JSON document and a unix-seconds TTL column the backend's
/// native expiry sweeps; this adapter never deletes rows itself.
pub struct KeyValueBackend {
    pool: SqlitePool,
    table_name: String,
}

impl KeyValueBackend {
    pub async fn new(connection_string: &str, table_name: &str) -> Result<Self> {
        let pool = SqlitePool::connect(connection_string)
            .await
            .with_context(|| format!("failed to connect to {connection_string}"))?;

        let backend = Self {
            pool,
            table_name: table_name.to_string(),
        };
        backend.create_table().await?;
        Ok(backend)
    }

    async fn create_table(&self) -> Result<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                review_id TEXT NOT NULL,
                component_type TEXT NOT NULL,
                data TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (review_id, component_type)
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql).execute(&self.pool).await?;

        let index_sql = format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_review_id ON {} (review_id)",
            self.table_name, self.table_name
        );
        sqlx::query(&index_sql).execute(&self.pool).await?;

        info!("key-value table '{}' created or verified", self.table_name);
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for KeyValueBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::KeyValueTable
    }

    fn consistency(&self) -> Consistency {
        Consistency::ReadAfterWrite
    }

    async fn put(&self, record: &ResultRecord) -> Result<()> {
        let data = serde_json::to_string(&record.data).context("failed to serialize result")?;

        let upsert_sql = format!(
            r#"
            INSERT INTO {} (review_id, component_type, data, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (review_id, component_type)
            DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at
            "#,
            self.table_name
        );

        sqlx::query(&upsert_sql)
            .bind(&record.review_id)
            .bind(record.component_type.as_str())
            .bind(&data)
            .bind(record.expires_at.timestamp())
            .execute(&self.pool)
            .await
            .context("key-value write rejected")?;

        debug!(
            review_id = %record.review_id,
            component = %record.component_type,
            "stored result row"
        );
        Ok(())
    }

    async fn get(
        &self,
        review_id: &str,
        component: ComponentType,
    ) -> Result<Option<serde_json::Value>> {
        let select_sql = format!(
            "SELECT data FROM {} WHERE review_id = ? AND component_type = ?",
            self.table_name
        );

        let row = sqlx::query(&select_sql)
            .bind(review_id)
            .bind(component.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("key-value read failed")?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                let value = serde_json::from_str(&data)
                    .with_context(|| format!("corrupt row for ({review_id}, {component})"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self, review_id: &str) -> Result<HashMap<ComponentType, serde_json::Value>> {
        let select_sql = format!(
            "SELECT component_type, data FROM {} WHERE review_id = ?",
            self.table_name
        );

        let rows = sqlx::query(&select_sql)
            .bind(review_id)
            .fetch_all(&self.pool)
            .await
            .context("key-value query failed")?;

        let mut results = HashMap::new();
        for row in rows {
            let component_str: String = row.try_get("component_type")?;
            let Some(component) = ComponentType::parse(&component_str) else {
                warn!(review_id, component = %component_str, "skipping row with unknown component key");
                continue;
            };

            let data: String = row.try_get("data")?;
            let value = serde_json::from_str(&data)
                .with_context(|| format!("corrupt row for ({review_id}, {component})"))?;
            results.insert(component, value);
        }

        debug!(review_id, count = results.len(), "queried result rows");
        Ok(results)
    }

    async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("key-value health check failed")?;
        Ok(true)
    }
}
