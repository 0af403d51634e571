//! Lock manager integration tests against SQLite.

mod common;

use common::TestContext;
use concord_core::ConcordError;
use concord_jobs::{DistributedLockExt, RetryPolicy};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquire_grants_exactly_one() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let attempts = (0..16).map(|_| {
        let locks = Arc::clone(&locks);
        tokio::spawn(async move { locks.acquire_lock("nightly-report", None).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let contended = results
        .iter()
        .filter(|r| matches!(r, Err(ConcordError::LockContention { .. })))
        .count();
    assert_eq!(granted, 1);
    assert_eq!(contended, 15);
}

#[tokio::test]
async fn test_expired_lease_is_taken_over_without_release() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let first = locks
        .acquire_lock("rebuild-index", Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = locks.acquire_lock("rebuild-index", None).await.unwrap();
    assert_ne!(first.id, second.id);

    let current = locks.find_lease("rebuild-index").await.unwrap().unwrap();
    assert_eq!(current.id, second.id);
}

#[tokio::test]
async fn test_release_frees_the_name() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let lease = locks.acquire_lock("billing", None).await.unwrap();
    assert!(locks.acquire_lock("billing", None).await.unwrap_err().is_contention());

    locks.release_lock(&lease).await.unwrap();
    assert!(locks.find_lease("billing").await.unwrap().is_none());
    locks.acquire_lock("billing", None).await.unwrap();
}

#[tokio::test]
async fn test_stale_holder_cannot_release_successor() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let stale = locks
        .acquire_lock("export", Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let current = locks.acquire_lock("export", None).await.unwrap();

    locks.release_lock(&stale).await.unwrap();

    let held = locks.find_lease("export").await.unwrap().unwrap();
    assert_eq!(held.id, current.id);
}

#[tokio::test]
async fn test_cleanup_removes_only_expired_leases() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    locks
        .acquire_lock("short", Some(Duration::from_millis(1)))
        .await
        .unwrap();
    locks.acquire_lock("long", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(locks.cleanup().await.unwrap(), 1);
    assert_eq!(locks.cleanup().await.unwrap(), 0);
    assert!(locks.find_lease("short").await.unwrap().is_none());
    assert!(locks.find_lease("long").await.unwrap().is_some());
}

#[tokio::test]
async fn test_renew_extends_live_lease() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let lease = locks
        .acquire_lock("compaction", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    let renewed = locks
        .renew_lock(&lease, Some(Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(renewed.id, lease.id);
    assert!(renewed.expiration_date > lease.expiration_date);
}

#[tokio::test]
async fn test_renew_after_takeover_is_contention() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let lease = locks
        .acquire_lock("compaction", Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    locks.acquire_lock("compaction", None).await.unwrap();

    let err = locks.renew_lock(&lease, None).await.unwrap_err();
    assert!(err.is_contention());
}

#[tokio::test]
async fn test_with_lock_releases_after_work() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    let value = locks
        .with_lock("digest", None, |lease| async move {
            assert_eq!(lease.name, "digest");
            Ok::<_, ConcordError>(7)
        })
        .await
        .unwrap();

    assert_eq!(value, 7);
    assert!(locks.find_lease("digest").await.unwrap().is_none());
}

#[tokio::test]
async fn test_retry_acquires_once_holder_expires() {
    let ctx = TestContext::new().await;
    let locks = ctx.locks();

    locks
        .acquire_lock("sync", Some(Duration::from_millis(50)))
        .await
        .unwrap();

    let policy = RetryPolicy::fixed(20, Duration::from_millis(25));
    let lease = locks
        .acquire_lock_with_retry("sync", None, &policy)
        .await
        .unwrap();
    assert_eq!(lease.name, "sync");
}
