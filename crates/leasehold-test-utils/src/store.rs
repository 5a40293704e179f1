//! Test store implementations with operation tracing.
//!
//! Wraps any [`LockStore`] and records every call for test assertions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use leasehold::error::{Error, Result};
use leasehold::{
    ConsistencySettings, CreateResult, DeleteResult, LockKey, LockRecord, LockScope, LockStore,
    MemoryLockStore, ReplaceResult,
};

/// Record of a store operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Conditional create.
    Create {
        /// Key that was created.
        key: LockKey,
        /// TTL submitted with the record.
        ttl_secs: u32,
    },
    /// Conditional replace.
    Replace {
        /// Key that was replaced.
        key: LockKey,
        /// Version token the replace was conditioned on.
        expected_version: String,
    },
    /// Conditional delete.
    Delete {
        /// Key that was deleted.
        key: LockKey,
        /// Version token the delete was conditioned on.
        expected_version: String,
    },
}

/// Which calls an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// Every `create`.
    Create,
    /// Every `replace`.
    Replace,
    /// Every `delete`.
    Delete,
}

/// Lock store decorator with operation tracing and failure injection.
///
/// Calls are recorded before failures are injected, so a failed call still
/// shows up in [`TracingLockStore::operations`].
#[derive(Debug)]
pub struct TracingLockStore<S = MemoryLockStore> {
    inner: Arc<S>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    failures: Arc<Mutex<Vec<FailOn>>>,
    latency: Option<Duration>,
}

impl TracingLockStore<MemoryLockStore> {
    /// Creates a tracing store over a fresh [`MemoryLockStore`].
    pub fn new() -> Self {
        Self::wrap(MemoryLockStore::new())
    }
}

impl Default for TracingLockStore<MemoryLockStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LockStore> TracingLockStore<S> {
    /// Wraps an existing store.
    pub fn wrap(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            operations: Arc::default(),
            failures: Arc::default(),
            latency: None,
        }
    }

    /// Adds simulated latency to every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns all recorded operations.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Number of `create` calls so far.
    pub fn create_calls(&self) -> usize {
        self.count(|op| matches!(op, StoreOp::Create { .. }))
    }

    /// Number of `replace` calls so far.
    pub fn replace_calls(&self) -> usize {
        self.count(|op| matches!(op, StoreOp::Replace { .. }))
    }

    /// Number of `delete` calls so far.
    pub fn delete_calls(&self) -> usize {
        self.count(|op| matches!(op, StoreOp::Delete { .. }))
    }

    /// Makes every subsequent call of the given kind fail with a storage error.
    pub fn inject_failure(&self, on: FailOn) {
        self.failures.lock().expect("lock").push(on);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock").clear();
    }

    fn count(&self, pred: impl Fn(&StoreOp) -> bool) -> usize {
        self.operations
            .lock()
            .expect("lock")
            .iter()
            .filter(|op| pred(op))
            .count()
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, on: FailOn) -> Result<()> {
        if self.failures.lock().expect("lock").contains(&on) {
            return Err(Error::storage(format!("injected failure on {on:?}")));
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl<S: LockStore> LockStore for TracingLockStore<S> {
    async fn create(&self, scope: &LockScope, record: &LockRecord) -> Result<CreateResult> {
        self.record(StoreOp::Create {
            key: record.key(),
            ttl_secs: record.lease_duration_secs,
        });
        self.maybe_delay().await;
        self.check_failure(FailOn::Create)?;
        self.inner.create(scope, record).await
    }

    async fn replace(
        &self,
        scope: &LockScope,
        key: &LockKey,
        record: &LockRecord,
        expected_version: &str,
    ) -> Result<ReplaceResult> {
        self.record(StoreOp::Replace {
            key: key.clone(),
            expected_version: expected_version.to_string(),
        });
        self.maybe_delay().await;
        self.check_failure(FailOn::Replace)?;
        self.inner
            .replace(scope, key, record, expected_version)
            .await
    }

    async fn delete(
        &self,
        scope: &LockScope,
        key: &LockKey,
        expected_version: &str,
    ) -> Result<DeleteResult> {
        self.record(StoreOp::Delete {
            key: key.clone(),
            expected_version: expected_version.to_string(),
        });
        self.maybe_delay().await;
        self.check_failure(FailOn::Delete)?;
        self.inner.delete(scope, key, expected_version).await
    }

    async fn consistency(&self) -> Result<ConsistencySettings> {
        self.inner.consistency().await
    }
}
