use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::Row;
use tokio_test::assert_ok;

use ops_review::models::ComponentType;
use ops_review::storage::backends::{BackendType, Consistency, StorageSettings};
use ops_review::storage::ResultStore;

async fn object_store(dir: &tempfile::TempDir) -> ResultStore {
    let settings = StorageSettings {
        backend: BackendType::ObjectStore,
        object_store_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    ResultStore::from_settings(&settings).await.unwrap()
}

async fn key_value_table() -> ResultStore {
    let settings = StorageSettings {
        backend: BackendType::KeyValueTable,
        connection_string: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    ResultStore::from_settings(&settings).await.unwrap()
}

async fn assert_round_trip(store: &ResultStore) {
    let payload = json!({"summary": {"critical": 0, "warning": 2}});
    store
        .put("r1", ComponentType::Quota, payload.clone())
        .await
        .unwrap();

    let got = store.get("r1", ComponentType::Quota).await.unwrap();
    assert_eq!(got, Some(payload));

    let missing = store.get("r1", ComponentType::Logs).await.unwrap();
    assert!(missing.is_none());
}

async fn assert_overwrite_keeps_single_record(store: &ResultStore) {
    store
        .put("r1", ComponentType::Phone, json!({"total_numbers": 1}))
        .await
        .unwrap();
    store
        .put("r1", ComponentType::Phone, json!({"total_numbers": 9}))
        .await
        .unwrap();

    let all = store.get_all("r1").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[&ComponentType::Phone], json!({"total_numbers": 9}));
}

async fn assert_unknown_review_is_empty(store: &ResultStore) {
    let all = store.get_all("never-ran").await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_object_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = object_store(&dir).await;
    assert_round_trip(&store).await;
}

#[tokio::test]
async fn test_key_value_round_trip() {
    let store = key_value_table().await;
    assert_round_trip(&store).await;
}

#[tokio::test]
async fn test_object_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = object_store(&dir).await;
    assert_overwrite_keeps_single_record(&store).await;
}

#[tokio::test]
async fn test_key_value_overwrite() {
    let store = key_value_table().await;
    assert_overwrite_keeps_single_record(&store).await;
}

#[tokio::test]
async fn test_object_store_unknown_review() {
    let dir = tempfile::tempdir().unwrap();
    let store = object_store(&dir).await;
    assert_unknown_review_is_empty(&store).await;
}

#[tokio::test]
async fn test_key_value_unknown_review() {
    let store = key_value_table().await;
    assert_unknown_review_is_empty(&store).await;
}

#[tokio::test]
async fn test_consistency_contracts() {
    let dir = tempfile::tempdir().unwrap();
    let object = object_store(&dir).await;
    assert_eq!(object.backend_type(), BackendType::ObjectStore);
    assert_eq!(object.consistency(), Consistency::EventualList);

    let table = key_value_table().await;
    assert_eq!(table.backend_type(), BackendType::KeyValueTable);
    assert_eq!(table.consistency(), Consistency::ReadAfterWrite);
}

#[tokio::test]
async fn test_results_scoped_per_review() {
    let store = key_value_table().await;

    store
        .put("r1", ComponentType::Flow, json!({"total_flows": 2}))
        .await
        .unwrap();
    store
        .put("r2", ComponentType::Flow, json!({"total_flows": 7}))
        .await
        .unwrap();

    let r1 = store.get_all("r1").await.unwrap();
    assert_eq!(r1[&ComponentType::Flow], json!({"total_flows": 2}));
    let r2 = store.get_all("r2").await.unwrap();
    assert_eq!(r2[&ComponentType::Flow], json!({"total_flows": 7}));
}

#[tokio::test]
async fn test_key_value_write_stamps_expiry_column() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let connection_string = format!("sqlite://{}?mode=rwc", db_path.display());

    let settings = StorageSettings {
        backend: BackendType::KeyValueTable,
        connection_string: connection_string.clone(),
        retention_days: 30,
        ..Default::default()
    };
    let store = ResultStore::from_settings(&settings).await.unwrap();

    let before = Utc::now();
    store
        .put("r1", ComponentType::Quota, json!({"used": 80}))
        .await
        .unwrap();
    let after = Utc::now();

    // Read the column the backend persisted, bypassing the adapter.
    let pool = sqlx::SqlitePool::connect(&connection_string).await.unwrap();
    let row = sqlx::query(
        "SELECT expires_at FROM review_results WHERE review_id = ? AND component_type = ?",
    )
    .bind("r1")
    .bind(ComponentType::Quota.as_str())
    .fetch_one(&pool)
    .await
    .unwrap();
    let expires_at: i64 = row.get("expires_at");

    assert!(expires_at >= (before + Duration::days(30)).timestamp());
    assert!(expires_at <= (after + Duration::days(30)).timestamp());
}

#[tokio::test]
async fn test_health_checks() {
    let dir = tempfile::tempdir().unwrap();
    let object = object_store(&dir).await;
    assert!(tokio_test::assert_ok!(object.health_check().await));

    let table = key_value_table().await;
    assert!(tokio_test::assert_ok!(table.health_check().await));
}
