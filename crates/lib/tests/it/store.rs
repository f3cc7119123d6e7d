//! One-time secret and user link stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use trackerlink::{
    FixedClock,
    backend::{Backend, InMemory},
    constants::{HOST_USER_PREFIX, TRACKER_USER_PREFIX},
    store::{OneTimeSecretStore, OneTimeSecrets, StoreError, UserLinkStore, UserLinks},
};

use crate::helpers::{FailingSetBackend, server_instance, test_backend, tracker_user};

const TRACKER_URL: &str = "https://tracker.test/";

#[tokio::test]
async fn test_secret_consume_is_single_use() {
    let secrets = OneTimeSecrets::new(test_backend().await);
    secrets.store("token", "secret").await.unwrap();

    assert_eq!(secrets.consume("token").await.unwrap(), "secret");

    let err = secrets.consume("token").await.unwrap_err();
    assert!(err.is_not_found());
    let err = secrets.load("token").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_secret_store_replaces_previous() {
    let secrets = OneTimeSecrets::new(test_backend().await);
    secrets.store("token", "first").await.unwrap();
    secrets.store("token", "second").await.unwrap();
    assert_eq!(secrets.load("token").await.unwrap(), "second");
}

#[tokio::test]
async fn test_secret_expires_after_ttl() {
    let clock = Arc::new(FixedClock::default());
    let backend = Arc::new(InMemory::with_clock(clock.clone()));
    let secrets = OneTimeSecrets::with_ttl(backend, Duration::from_secs(900));

    secrets.store("token", "secret").await.unwrap();
    clock.advance(Duration::from_secs(899));
    assert_eq!(secrets.load("token").await.unwrap(), "secret");

    clock.advance(Duration::from_secs(2));
    assert!(secrets.consume("token").await.unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consume_hands_out_secret_once() {
    let secrets = OneTimeSecrets::new(test_backend().await);

    for round in 0..20 {
        let token = format!("tok-{round}");
        secrets.store(&token, "secA").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let secrets = secrets.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move { secrets.consume(&token).await }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(secret) => {
                    assert_eq!(secret, "secA");
                    winners += 1;
                }
                Err(err) => assert!(err.is_not_found()),
            }
        }
        assert_eq!(winners, 1, "round {round}");
    }
}

/// Loads succeed but deletes always fail.
#[derive(Debug)]
struct StickySecrets;

#[async_trait]
impl OneTimeSecretStore for StickySecrets {
    async fn store(&self, _token: &str, _secret: &str) -> trackerlink::Result<()> {
        Ok(())
    }

    async fn load(&self, _token: &str) -> trackerlink::Result<String> {
        Ok("secret".to_string())
    }

    async fn delete(&self, _token: &str) -> trackerlink::Result<()> {
        Err(StoreError::SecretDeleteFailed {
            reason: "backend unavailable".to_string(),
        }
        .into())
    }
}

#[tokio::test]
async fn test_consume_withholds_secret_when_delete_fails() {
    let err = StickySecrets.consume("token").await.unwrap_err();
    assert!(matches!(
        err,
        trackerlink::Error::Store(StoreError::SecretDeleteFailed { .. })
    ));
    assert_eq!(err.kind(), trackerlink::ErrorKind::InternalFailure);
}

#[tokio::test]
async fn test_link_forward_and_reverse_lookup() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    let user = tracker_user("jdoe", "Jane Doe");
    links.store(&instance, "u1", &user).await.unwrap();

    assert_eq!(links.load_by_host_user(&instance, "u1").await.unwrap(), user);
    assert_eq!(
        links
            .load_host_user_by_tracker_username(&instance, "jdoe")
            .await
            .unwrap(),
        "u1"
    );
}

#[tokio::test]
async fn test_link_missing_is_not_found() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    let err = links.load_by_host_user(&instance, "nobody").await.unwrap_err();
    assert!(err.is_not_found());
    let err = links
        .load_host_user_by_tracker_username(&instance, "nobody")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_links_are_partitioned_by_instance() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let main = server_instance(&backend, "main", TRACKER_URL);
    // Same URL, different storage key
    let other = server_instance(&backend, "other", TRACKER_URL);

    links
        .store(&main, "u1", &tracker_user("jdoe", "Jane Doe"))
        .await
        .unwrap();

    assert!(
        links
            .load_by_host_user(&other, "u1")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        links
            .load_host_user_by_tracker_username(&other, "jdoe")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_relink_with_new_username_drops_stale_reverse_entry() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    links
        .store(&instance, "u1", &tracker_user("old", "Old Name"))
        .await
        .unwrap();
    links
        .store(&instance, "u1", &tracker_user("new", "New Name"))
        .await
        .unwrap();

    assert!(
        links
            .load_host_user_by_tracker_username(&instance, "old")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(
        links
            .load_host_user_by_tracker_username(&instance, "new")
            .await
            .unwrap(),
        "u1"
    );
}

#[tokio::test]
async fn test_delete_removes_both_directions() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    links
        .store(&instance, "u1", &tracker_user("jdoe", "Jane Doe"))
        .await
        .unwrap();
    links.delete(&instance, "u1").await.unwrap();

    assert!(
        links
            .load_by_host_user(&instance, "u1")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        links
            .load_host_user_by_tracker_username(&instance, "jdoe")
            .await
            .unwrap_err()
            .is_not_found()
    );

    // Deleting again succeeds
    links.delete(&instance, "u1").await.unwrap();
}

#[tokio::test]
async fn test_delete_keeps_reverse_entry_owned_by_another_user() {
    let backend = test_backend().await;
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    // Both host users linked the same tracker account; u2 linked last
    links
        .store(&instance, "u1", &tracker_user("shared", "Shared"))
        .await
        .unwrap();
    links
        .store(&instance, "u2", &tracker_user("shared", "Shared"))
        .await
        .unwrap();

    links.delete(&instance, "u1").await.unwrap();
    assert_eq!(
        links
            .load_host_user_by_tracker_username(&instance, "shared")
            .await
            .unwrap(),
        "u2"
    );
}

#[tokio::test]
async fn test_failed_forward_write_leaves_no_reverse_entry() {
    let inner = test_backend().await;
    let backend: Arc<dyn Backend> = Arc::new(FailingSetBackend::new(inner.clone(), HOST_USER_PREFIX));
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    assert!(
        links
            .store(&instance, "u1", &tracker_user("jdoe", "Jane Doe"))
            .await
            .is_err()
    );

    let reader = UserLinks::new(inner);
    assert!(
        reader
            .load_by_host_user(&instance, "u1")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        reader
            .load_host_user_by_tracker_username(&instance, "jdoe")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_failed_forward_write_restores_previous_reverse_entry() {
    let inner = test_backend().await;
    let instance = server_instance(&inner, "main", TRACKER_URL);
    let reader = UserLinks::new(inner.clone());
    reader
        .store(&instance, "u2", &tracker_user("shared", "Shared"))
        .await
        .unwrap();

    let backend: Arc<dyn Backend> = Arc::new(FailingSetBackend::new(inner, HOST_USER_PREFIX));
    let links = UserLinks::new(backend);
    assert!(
        links
            .store(&instance, "u1", &tracker_user("shared", "Shared"))
            .await
            .is_err()
    );

    assert_eq!(
        reader
            .load_host_user_by_tracker_username(&instance, "shared")
            .await
            .unwrap(),
        "u2"
    );
}

#[tokio::test]
async fn test_failed_reverse_write_stores_nothing() {
    let inner = test_backend().await;
    let backend: Arc<dyn Backend> =
        Arc::new(FailingSetBackend::new(inner.clone(), TRACKER_USER_PREFIX));
    let links = UserLinks::new(backend.clone());
    let instance = server_instance(&backend, "main", TRACKER_URL);

    assert!(
        links
            .store(&instance, "u1", &tracker_user("jdoe", "Jane Doe"))
            .await
            .is_err()
    );
    assert!(
        UserLinks::new(inner)
            .load_by_host_user(&instance, "u1")
            .await
            .unwrap_err()
            .is_not_found()
    );
}
