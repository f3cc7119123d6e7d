//! The `Backend` contract, checked against every implementation.

use std::sync::Arc;
use std::time::Duration;

use trackerlink::{
    FixedClock,
    backend::{Backend, InMemory},
};

use crate::helpers::test_backend;

async fn check_basic_operations(backend: &dyn Backend) {
    assert_eq!(backend.get("missing").await.unwrap(), None);

    backend.set("k", "v1".to_string(), None).await.unwrap();
    assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v1"));

    backend.set("k", "v2".to_string(), None).await.unwrap();
    assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v2"));

    backend.delete("k").await.unwrap();
    assert_eq!(backend.get("k").await.unwrap(), None);

    // Deleting an absent key succeeds
    backend.delete("k").await.unwrap();
}

async fn check_take(backend: &dyn Backend, clock: &FixedClock) {
    backend.set("once", "v".to_string(), None).await.unwrap();
    assert_eq!(backend.take("once").await.unwrap().as_deref(), Some("v"));
    assert_eq!(backend.take("once").await.unwrap(), None);
    assert_eq!(backend.get("once").await.unwrap(), None);

    backend
        .set("stale", "v".to_string(), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(1));
    assert_eq!(backend.take("stale").await.unwrap(), None);
}

/// Many tasks race to take one key; exactly one receives the value.
async fn check_concurrent_take(backend: Arc<dyn Backend>) {
    for round in 0..20 {
        let key = format!("race-{round}");
        backend.set(&key, "secret".to_string(), None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let backend = backend.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move { backend.take(&key).await.unwrap() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "round {round}");
    }
}

async fn check_set_if_absent(backend: &dyn Backend) {
    assert!(
        backend
            .set_if_absent("once", "first".to_string(), None)
            .await
            .unwrap()
    );
    assert!(
        !backend
            .set_if_absent("once", "second".to_string(), None)
            .await
            .unwrap()
    );
    assert_eq!(backend.get("once").await.unwrap().as_deref(), Some("first"));
}

async fn check_expiry(backend: &dyn Backend, clock: &FixedClock) {
    backend
        .set("short", "v".to_string(), Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(backend.get("short").await.unwrap().as_deref(), Some("v"));

    clock.advance(Duration::from_secs(61));
    assert_eq!(backend.get("short").await.unwrap(), None);

    // An expired value does not block an atomic create
    assert!(
        backend
            .set_if_absent("short", "fresh".to_string(), None)
            .await
            .unwrap()
    );
    assert_eq!(backend.get("short").await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_default_backend_contract() {
    let backend = test_backend().await;
    check_basic_operations(backend.as_ref()).await;
    check_set_if_absent(backend.as_ref()).await;
}

#[tokio::test]
async fn test_in_memory_contract() {
    let clock = Arc::new(FixedClock::default());
    let backend = InMemory::with_clock(clock.clone());
    check_basic_operations(&backend).await;
    check_set_if_absent(&backend).await;
    check_expiry(&backend, &clock).await;
    check_take(&backend, &clock).await;
    assert_eq!(backend.kind_name(), "inmemory");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_memory_concurrent_take_has_one_winner() {
    check_concurrent_take(Arc::new(InMemory::new())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_contract() {
    use trackerlink::backend::SqlxBackend;

    let clock = Arc::new(FixedClock::default());
    let backend = SqlxBackend::sqlite_in_memory()
        .await
        .unwrap()
        .with_clock(clock.clone());
    check_basic_operations(&backend).await;
    check_set_if_absent(&backend).await;
    check_expiry(&backend, &clock).await;
    check_take(&backend, &clock).await;
    assert_eq!(backend.kind_name(), "sqlite");
}

#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_take_has_one_winner() {
    use trackerlink::backend::SqlxBackend;

    let backend = SqlxBackend::sqlite_in_memory().await.unwrap();
    check_concurrent_take(Arc::new(backend)).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_rejects_unknown_schema_version() {
    use trackerlink::backend::{SqlxBackend, database::sql::schema::SCHEMA_VERSION};

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("trackerlink.db");

    {
        let backend = SqlxBackend::open_sqlite(&db_path).await.unwrap();
        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(SCHEMA_VERSION + 1)
            .execute(backend.pool())
            .await
            .unwrap();
    }

    let err = SqlxBackend::open_sqlite(&db_path).await.unwrap_err();
    assert!(matches!(
        err,
        trackerlink::Error::Backend(ref e) if e.is_schema_version_mismatch()
    ));
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_file_survives_reopen() {
    use trackerlink::backend::SqlxBackend;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("trackerlink.db");

    {
        let backend = SqlxBackend::open_sqlite(&db_path).await.unwrap();
        backend
            .set("persisted", "yes".to_string(), None)
            .await
            .unwrap();
    }

    let backend = SqlxBackend::open_sqlite(&db_path).await.unwrap();
    assert_eq!(
        backend.get("persisted").await.unwrap().as_deref(),
        Some("yes")
    );
}

#[tokio::test]
async fn test_concurrent_set_if_absent_has_one_winner() {
    let backend = test_backend().await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            backend
                .set_if_absent("race", format!("writer-{i}"), None)
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert!(backend.get("race").await.unwrap().is_some());
}

#[tokio::test]
async fn test_in_memory_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trackerlink.json");

    let backend = InMemory::new();
    backend.set("a", "1".to_string(), None).await.unwrap();
    backend
        .set("b", "2".to_string(), Some(Duration::from_secs(3600)))
        .await
        .unwrap();
    backend.save_to_file(&path).await.unwrap();

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.get("a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(loaded.get("b").await.unwrap().as_deref(), Some("2"));

    let mut keys = loaded.keys().await;
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_in_memory_load_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = InMemory::load_from_file(dir.path().join("absent.json"))
        .await
        .unwrap();
    assert!(loaded.keys().await.is_empty());
}

#[tokio::test]
async fn test_in_memory_load_rejects_unknown_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.json");
    tokio::fs::write(&path, r#"{"_v": 7, "entries": {}}"#)
        .await
        .unwrap();

    assert!(InMemory::load_from_file(&path).await.is_err());
}
