//! Integration tests for `TenantRouter` over real and in-memory openers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{EventDate, TenantId};
use gauntlet_core::repository::{EventRecord, TenantStore};
use gauntlet_core::tenant::{StoreOpener, TenantRouter};
use gauntlet_store::SqliteStoreOpener;
use gauntlet_test_support::InMemoryStoreOpener;

const OPEN_DELAY: Duration = Duration::from_millis(100);

/// Fails the first open, then delegates.
struct FlakyOpener {
    calls: AtomicUsize,
    inner: InMemoryStoreOpener,
}

#[async_trait]
impl StoreOpener for FlakyOpener {
    async fn open(&self, tenant_id: &TenantId) -> Result<Arc<dyn TenantStore>, DomainError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(DomainError::Infrastructure("disk unavailable".into()));
        }
        self.inner.open(tenant_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_access_opens_store_once() {
    // Arrange
    let opener = Arc::new(InMemoryStoreOpener::with_open_delay(OPEN_DELAY));
    let router = Arc::new(TenantRouter::new(opener.clone()));
    let tenant_id = TenantId::parse("guild-1").unwrap();

    // Act
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let router = Arc::clone(&router);
            let tenant_id = tenant_id.clone();
            tokio::spawn(async move { router.handle_for(&tenant_id).await })
        })
        .collect();
    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    // Assert
    assert_eq!(opener.open_calls(), 1);
    assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(router.open_count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_access_for_different_tenants_runs_in_parallel() {
    // Arrange
    let opener = Arc::new(InMemoryStoreOpener::with_open_delay(OPEN_DELAY));
    let router = Arc::new(TenantRouter::new(opener.clone()));
    let started = tokio::time::Instant::now();

    // Act
    let tasks: Vec<_> = ["guild-1", "guild-2", "guild-3"]
        .into_iter()
        .map(|raw| {
            let router = Arc::clone(&router);
            let tenant_id = TenantId::parse(raw).unwrap();
            tokio::spawn(async move { router.handle_for(&tenant_id).await.map(|_| ()) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Assert: three delayed opens overlapped instead of queueing.
    assert_eq!(opener.open_calls(), 3);
    assert!(started.elapsed() < OPEN_DELAY * 2);
    assert_eq!(router.open_count().unwrap(), 3);
}

#[tokio::test]
async fn test_failed_open_is_retried_on_next_access() {
    // Arrange
    let opener = Arc::new(FlakyOpener {
        calls: AtomicUsize::new(0),
        inner: InMemoryStoreOpener::new(),
    });
    let router = TenantRouter::new(opener.clone());
    let tenant_id = TenantId::parse("guild-1").unwrap();

    // Act
    let first = router.handle_for(&tenant_id).await;
    let second = router.handle_for(&tenant_id).await;

    // Assert
    assert!(matches!(first, Err(DomainError::Infrastructure(_))));
    assert!(second.is_ok());
    assert_eq!(opener.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_open_handles_lists_opened_tenants_only() {
    // Arrange
    let router = TenantRouter::new(Arc::new(InMemoryStoreOpener::new()));
    assert!(router.open_handles().unwrap().is_empty());

    // Act
    router.handle_for(&TenantId::parse("guild-2").unwrap()).await.unwrap();
    router.handle_for(&TenantId::parse("guild-1").unwrap()).await.unwrap();

    // Assert
    let mut ids: Vec<String> = router
        .open_handles()
        .unwrap()
        .iter()
        .map(|handle| handle.tenant_id().as_str().to_owned())
        .collect();
    ids.sort();
    assert_eq!(ids, ["guild-1", "guild-2"]);
}

#[tokio::test]
async fn test_close_all_closes_every_store_and_empties_cache() {
    // Arrange
    let opener = Arc::new(InMemoryStoreOpener::new());
    let router = TenantRouter::new(opener.clone());
    let first = TenantId::parse("guild-1").unwrap();
    let second = TenantId::parse("guild-2").unwrap();
    router.handle_for(&first).await.unwrap();
    router.handle_for(&second).await.unwrap();

    // Act
    router.close_all().await.unwrap();

    // Assert
    assert!(opener.store_for(&first).unwrap().is_closed());
    assert!(opener.store_for(&second).unwrap().is_closed());
    assert_eq!(router.open_count().unwrap(), 0);
}

#[tokio::test]
async fn test_cached_handle_shares_sqlite_database() {
    // Arrange
    let router = TenantRouter::new(Arc::new(SqliteStoreOpener::in_memory()));
    let tenant_id = TenantId::parse("guild-1").unwrap();
    let date = EventDate::parse("2026-03-25").unwrap();
    let writer = router.handle_for(&tenant_id).await.unwrap();
    writer
        .store()
        .insert_event(&EventRecord {
            date,
            name: None,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    // Act
    let reader = router.handle_for(&tenant_id).await.unwrap();

    // Assert
    assert!(reader.store().find_event(&date).await.unwrap().is_some());
    let other = router
        .handle_for(&TenantId::parse("guild-2").unwrap())
        .await
        .unwrap();
    assert!(other.store().find_event(&date).await.unwrap().is_none());
    router.close_all().await.unwrap();
}
