//! Release semantics.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use leasehold::Error;
use leasehold_test_utils::{FailOn, options, tracing_client};

#[tokio::test(start_paused = true)]
async fn release_then_acquire_succeeds() {
    let (client, store) = tracing_client().await;
    let first = client.acquire(&options("reuse", 60)).await.expect("acquire");
    client.release(&first).await.expect("release");
    assert!(!first.is_acquired());

    let second = client.acquire(&options("reuse", 60)).await.expect("acquire");
    assert!(second.is_acquired());
    assert_eq!(store.create_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn release_is_idempotent() {
    let (client, store) = tracing_client().await;
    let lock = client.acquire(&options("twice", 60)).await.expect("acquire");

    client.release(&lock).await.expect("first release");
    client.release(&lock).await.expect("second release");
    assert_eq!(store.delete_calls(), 2);
    assert!(store.inner().is_empty());
}

#[tokio::test(start_paused = true)]
async fn release_after_expiry_is_silent() {
    let (client, _store) = tracing_client().await;
    let lock = client.acquire(&options("gone", 1)).await.expect("acquire");

    tokio::time::sleep(Duration::from_secs(2)).await;
    client.release(&lock).await.expect("release");
    assert!(!lock.is_acquired());
}

#[tokio::test(start_paused = true)]
async fn stale_release_leaves_the_new_holder_alone() {
    let (client, store) = tracing_client().await;
    let stale = client.acquire(&options("shared", 1)).await.expect("acquire");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let current = client.acquire(&options("shared", 60)).await.expect("acquire");

    client.release(&stale).await.expect("release");
    assert!(current.is_acquired());
    assert_eq!(
        store.inner().version(client.scope(), current.key()),
        Some(current.version())
    );
}

#[tokio::test(start_paused = true)]
async fn storage_failure_keeps_the_lock() {
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("sticky", 60).with_auto_renew(true))
        .await
        .expect("acquire");

    store.inject_failure(FailOn::Delete);
    let err = client.release(&lock).await.unwrap_err();
    assert!(matches!(err, Error::Storage { .. }));
    assert!(lock.is_acquired());
    assert!(lock.is_auto_renewing());

    store.clear_failures();
    client.release(&lock).await.expect("release");
    assert!(!lock.is_auto_renewing());
}
