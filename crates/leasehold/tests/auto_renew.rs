//! Background renewal cadence under paused time.
//!
//! With a 2 s lease the scheduler fires every 666.67 ms, which tokio rounds
//! up to whole milliseconds: 667, 1334, 2001, 2668, 3335, 4002, ...

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use leasehold::{LockClient, LockStore};
use leasehold_test_utils::{
    FailOn, StoreOp, TracingLockStore, init_test_logging, options, test_scope, tracing_client,
};

#[tokio::test(start_paused = true)]
async fn renews_every_third_of_the_lease() {
    init_test_logging();
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("cadence", 2).with_auto_renew(true))
        .await
        .expect("acquire");
    assert!(lock.is_auto_renewing());

    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(lock.is_acquired());
    }

    assert_eq!(store.replace_calls(), 5);
    assert!(lock.is_auto_renewing());
}

#[tokio::test(start_paused = true)]
async fn failing_renewals_stop_once_the_lease_runs_out() {
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("failing", 2).with_auto_renew(true))
        .await
        .expect("acquire");
    store.inject_failure(FailOn::Replace);

    tokio::time::sleep(Duration::from_millis(1999)).await;
    assert!(lock.is_acquired());

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!lock.is_acquired());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.replace_calls(), 2);
    assert!(!lock.is_auto_renewing());
}

#[tokio::test(start_paused = true)]
async fn release_stops_renewal() {
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("stop", 2).with_auto_renew(true))
        .await
        .expect("acquire");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.replace_calls(), 2);

    client.release(&lock).await.expect("release");
    assert!(!lock.is_auto_renewing());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.replace_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn release_waits_for_an_in_flight_renewal() {
    let store = Arc::new(TracingLockStore::new().with_latency(Duration::from_millis(300)));
    let client = LockClient::new(Arc::clone(&store), test_scope())
        .await
        .expect("client");

    // Returns at 300 ms; the first renewal starts at 1300 ms and is still
    // waiting on the store when release is issued at 1400 ms.
    let lock = client
        .acquire(&options("in-flight", 3).with_auto_renew(true))
        .await
        .expect("acquire");
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(store.replace_calls(), 1);

    client.release(&lock).await.expect("release");
    assert!(!lock.is_acquired());
    assert!(!lock.is_auto_renewing());
    assert!(store.inner().is_empty());

    // The delete presented the token written by the renewal.
    let ops = store.operations();
    match ops.last() {
        Some(StoreOp::Delete {
            expected_version, ..
        }) => assert_eq!(*expected_version, lock.version()),
        other => panic!("expected a delete last, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.replace_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_renewal() {
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("dropped", 3).with_auto_renew(true))
        .await
        .expect("acquire");
    drop(lock);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.replace_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn lost_lease_stops_renewal() {
    let (client, store) = tracing_client().await;
    let lock = client
        .acquire(&options("stolen", 3).with_auto_renew(true))
        .await
        .expect("acquire");

    // Another party removes the record out from under the holder.
    store
        .inner()
        .delete(client.scope(), lock.key(), &lock.version())
        .await
        .expect("delete");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.replace_calls(), 1);
    assert!(!lock.is_acquired());
    assert!(!lock.is_auto_renewing());
}

#[tokio::test(start_paused = true)]
async fn rearm_subtracts_renewal_latency() {
    let store = Arc::new(TracingLockStore::new().with_latency(Duration::from_millis(100)));
    let client = LockClient::new(Arc::clone(&store), test_scope())
        .await
        .expect("client");

    // Returns at 100 ms; renewals then start every 1000 ms from 1100 ms. A
    // scheduler that ignored the 100 ms round trip would drift to 1100 ms
    // apart and make only 8 calls in this window.
    let lock = client
        .acquire(&options("slow", 3).with_auto_renew(true))
        .await
        .expect("acquire");

    tokio::time::sleep(Duration::from_millis(9400)).await;
    assert_eq!(store.replace_calls(), 9);
    assert!(lock.is_acquired());
}
