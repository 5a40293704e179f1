//! Fixtures for building clients in tests.

use std::sync::Arc;
use std::time::Duration;

use leasehold::{AcquireOptions, LockClient, LockScope};

use crate::store::TracingLockStore;

/// Scope used by fixture clients.
pub fn test_scope() -> LockScope {
    LockScope::new("leasehold-test", "locks").expect("valid scope")
}

/// Builds a client over a fresh [`TracingLockStore`] and returns both.
pub async fn tracing_client() -> (LockClient<TracingLockStore>, Arc<TracingLockStore>) {
    let store = Arc::new(TracingLockStore::new());
    let client = LockClient::new(Arc::clone(&store), test_scope())
        .await
        .expect("strong store");
    (client, store)
}

/// Options for `name` in a shared partition with the given lease.
pub fn options(name: &str, lease_secs: u32) -> AcquireOptions {
    AcquireOptions::new("tests", name).with_lease_duration_secs(lease_secs)
}

/// Options that retry every `retry_wait` for up to `timeout`.
pub fn retrying_options(
    name: &str,
    lease_secs: u32,
    timeout: Duration,
    retry_wait: Duration,
) -> AcquireOptions {
    options(name, lease_secs)
        .with_timeout(timeout)
        .with_retry_wait(retry_wait)
}
