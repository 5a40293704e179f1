//! Lease lock client.
//!
//! Locks are lease records in a strongly-consistent store:
//! - **Acquire**: conditional create. Exactly one creator wins while the
//!   record is live; losers retry until their timeout runs out.
//! - **Renew**: conditional replace on the version token of the last write.
//!   A mismatch or a missing record means the lease was lost.
//! - **Release**: conditional delete. Mismatch and missing both count as
//!   released, so release is idempotent.
//! - **Expiry**: the record's `ttl` lets the store delete it on its own,
//!   which is what frees a lock whose holder vanished.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use leasehold::{AcquireOptions, LockClient, LockScope, MemoryLockStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> leasehold::Result<()> {
//! let store = Arc::new(MemoryLockStore::new());
//! let client = LockClient::new(store, LockScope::new("app", "leases")?).await?;
//!
//! let lock = client
//!     .acquire(&AcquireOptions::new("tenant-a", "nightly-report"))
//!     .await?;
//!
//! // Critical section - only one holder at a time
//! assert!(lock.is_acquired());
//!
//! client.release(&lock).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::clock::{Clock, TokioClock};
use crate::config::{LivenessPolicy, LockClientConfig};
use crate::consistency;
use crate::error::{Error, Result};
use crate::lock::Lock;
use crate::observability::lock_span;
use crate::options::AcquireOptions;
use crate::record::LockScope;
use crate::renewal;
use crate::store::{CreateResult, DeleteResult, LockStore, ReplaceResult};

/// Client for acquiring, renewing and releasing lease locks.
///
/// The client does not own the store connection and holds no lock state of
/// its own; it is cheap to clone.
pub struct LockClient<S: LockStore + ?Sized> {
    store: Arc<S>,
    scope: LockScope,
    clock: Arc<dyn Clock>,
    config: LockClientConfig,
}

// Manual Clone implementation to avoid requiring S: Clone
impl<S: LockStore + ?Sized> Clone for LockClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scope: self.scope.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: LockStore + ?Sized> std::fmt::Debug for LockClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockClient")
            .field("scope", &self.scope)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: LockStore + ?Sized> LockClient<S> {
    /// Creates a client after verifying the store is strongly consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConsistencyLevel`] if the store's effective
    /// consistency is weaker than strong, or the store's error if its
    /// consistency settings cannot be read.
    pub async fn new(store: Arc<S>, scope: LockScope) -> Result<Self> {
        Self::with_clock(store, scope, Arc::new(TokioClock)).await
    }

    /// Creates a client that timestamps leases with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub async fn with_clock(store: Arc<S>, scope: LockScope, clock: Arc<dyn Clock>) -> Result<Self> {
        let settings = store.consistency().await?;
        consistency::verify(&settings)?;
        tracing::debug!(%scope, "lock client ready");

        Ok(Self {
            store,
            scope,
            clock,
            config: LockClientConfig::default(),
        })
    }

    /// Sets client configuration.
    #[must_use]
    pub fn with_config(mut self, config: LockClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the scope new locks are created in.
    #[must_use]
    pub fn scope(&self) -> &LockScope {
        &self.scope
    }

    /// Returns the store this client talks to.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &LockClientConfig {
        &self.config
    }

    /// Returns the clock used for lease bookkeeping.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Acquires a lock, retrying until `options.timeout` has elapsed.
    ///
    /// A zero timeout makes exactly one attempt; otherwise attempts are made
    /// every `options.retry_wait` until one starts at or past the timeout,
    /// which is `ceil(timeout / retry_wait) + 1` attempts against a held lock.
    /// The timeout is measured on tokio's clock, not the injected [`Clock`].
    ///
    /// With `options.auto_renew` the returned lock is renewed in the
    /// background until released.
    ///
    /// Dropping the returned future abandons acquisition between attempts.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the options fail validation.
    /// - [`Error::LockUnavailable`] if the lock was still held by someone else
    ///   when the timeout ran out.
    /// - Any other store error, immediately and without retrying.
    pub async fn acquire(&self, options: &AcquireOptions) -> Result<Lock> {
        self.acquire_inner(options, None).await
    }

    /// Like [`Self::acquire`], but stops retrying as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Same as [`Self::acquire`], plus [`Error::Cancelled`] if `cancel` fires
    /// before the lock is acquired.
    pub async fn acquire_with_cancellation(
        &self,
        options: &AcquireOptions,
        cancel: &CancellationToken,
    ) -> Result<Lock> {
        self.acquire_inner(options, Some(cancel)).await
    }

    async fn acquire_inner(
        &self,
        options: &AcquireOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Lock> {
        options.validate()?;
        let span = lock_span("acquire", &options.partition_key, &options.lock_name);
        self.acquire_with_retry(options, cancel)
            .instrument(span)
            .await
    }

    async fn acquire_with_retry(
        &self,
        options: &AcquireOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Lock> {
        // Retry waits are tokio sleeps, so the deadline is kept on the same
        // clock. The injected clock only stamps leases.
        let start = Instant::now();
        let mut attempts: u32 = 0;

        let last = loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(cancelled(options));
            }
            attempts += 1;

            match self.try_acquire_once(options).await {
                Ok(lock) => {
                    if options.auto_renew {
                        self.start_renewal(&lock);
                    }
                    tracing::info!(attempts, version = %lock.version(), "lock acquired");
                    return Ok(lock);
                }
                Err(e) if e.is_lock_unavailable() => {
                    let elapsed = start.elapsed();
                    if elapsed >= options.timeout {
                        break e;
                    }
                    tracing::debug!(attempts, ?elapsed, "lock unavailable, retrying");
                }
                Err(e) => return Err(e),
            }

            match cancel {
                Some(cancel) => {
                    tokio::select! {
                        () = cancel.cancelled() => return Err(cancelled(options)),
                        () = tokio::time::sleep(options.retry_wait) => {}
                    }
                }
                None => tokio::time::sleep(options.retry_wait).await,
            }
        };

        tracing::info!(attempts, "lock unavailable, giving up");
        Err(Error::LockUnavailable {
            partition_key: options.partition_key.clone(),
            name: options.lock_name.clone(),
            attempts,
            source: Some(Box::new(last)),
        })
    }

    /// Makes a single acquisition attempt.
    async fn try_acquire_once(&self, options: &AcquireOptions) -> Result<Lock> {
        let record = options.record();
        let time_acquired = self.clock.now();

        match self.store.create(&self.scope, &record).await? {
            CreateResult::Created { version } => Ok(Lock::new(
                self.scope.clone(),
                &record,
                version,
                time_acquired,
                Arc::clone(&self.clock),
            )),
            CreateResult::Conflict => Err(Error::LockUnavailable {
                partition_key: record.partition_key,
                name: record.name,
                attempts: 1,
                source: None,
            }),
        }
    }

    fn start_renewal(&self, lock: &Lock) {
        let task = renewal::spawn(self.clone(), lock);
        lock.shared.state().renewal = Some(task);
    }

    /// Extends the lease on `lock` by a full lease duration.
    ///
    /// On success the lock adopts the new version token and its lease window
    /// restarts at the moment the renewal was sent.
    ///
    /// # Errors
    ///
    /// - [`Error::LockReleased`] if the lease is gone: it was released, it
    ///   expired, or another holder owns a newer record at the same key. The
    ///   caller has to acquire again.
    /// - Any other store error, unchanged.
    pub async fn renew(&self, lock: &Lock) -> Result<()> {
        let shared = &lock.shared;
        let _gate = shared.gate.lock().await;

        let version = {
            let state = shared.state();
            if state.released {
                return Err(released(lock));
            }
            state.version.clone()
        };

        let record = lock.record();
        let time_acquired = self.clock.now();
        let outcome = self
            .store
            .replace(&shared.scope, &shared.key, &record, &version)
            .await?;

        let mut state = shared.state();
        match outcome {
            ReplaceResult::Replaced { version } => {
                state.version = version;
                state.time_acquired = time_acquired;
                Ok(())
            }
            ReplaceResult::PreconditionFailed | ReplaceResult::NotFound => {
                state.lost = true;
                drop(state);
                tracing::info!(
                    partition_key = lock.partition_key(),
                    name = lock.name(),
                    ?outcome,
                    "lease lost"
                );
                Err(released(lock))
            }
        }
    }

    /// Releases `lock` and stops its background renewal.
    ///
    /// Releasing a lock whose record is already gone, or now belongs to
    /// someone else, succeeds without touching the other holder's record.
    /// Calling this more than once is fine.
    ///
    /// # Errors
    ///
    /// Returns the store's error for failures with no lock meaning. The lock
    /// is left as it was in that case.
    pub async fn release(&self, lock: &Lock) -> Result<()> {
        let shared = &lock.shared;
        let span = lock_span("release", lock.partition_key(), lock.name());
        let _gate = shared.gate.lock().await;

        let version = shared.state().version.clone();
        let outcome = self
            .store
            .delete(&shared.scope, &shared.key, &version)
            .instrument(span.clone())
            .await?;

        let renewal = {
            let mut state = shared.state();
            state.released = true;
            state.renewal.take()
        };
        if let Some(task) = renewal {
            task.stop();
        }

        span.in_scope(|| match outcome {
            DeleteResult::Deleted => tracing::info!("lock released"),
            DeleteResult::PreconditionFailed | DeleteResult::NotFound => {
                tracing::debug!(?outcome, "lock was already gone");
            }
        });
        Ok(())
    }

    /// Returns whether `lock` is still held, according to the configured
    /// [`LivenessPolicy`].
    ///
    /// With [`LivenessPolicy::RevalidateWithin`] the store is consulted
    /// (through a renew) once the local lease is close to running out.
    ///
    /// # Errors
    ///
    /// Returns store errors raised while revalidating.
    pub async fn is_held(&self, lock: &Lock) -> Result<bool> {
        if !lock.is_acquired() {
            return Ok(false);
        }
        match self.config.liveness {
            LivenessPolicy::LocalClock => Ok(true),
            LivenessPolicy::RevalidateWithin(margin) => {
                if lock.remaining() > margin {
                    return Ok(true);
                }
                match self.renew(lock).await {
                    Ok(()) => Ok(true),
                    Err(e) if e.is_lock_released() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn released(lock: &Lock) -> Error {
    Error::LockReleased {
        partition_key: lock.partition_key().to_string(),
        name: lock.name().to_string(),
    }
}

fn cancelled(options: &AcquireOptions) -> Error {
    Error::Cancelled {
        partition_key: options.partition_key.clone(),
        name: options.lock_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::consistency::{ConsistencyLevel, ConsistencySettings};
    use crate::memory::MemoryLockStore;

    async fn client() -> LockClient<MemoryLockStore> {
        LockClient::new(
            Arc::new(MemoryLockStore::new()),
            LockScope::new("db", "leases").expect("scope"),
        )
        .await
        .expect("client")
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let client = client().await;
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job"))
            .await
            .expect("acquire");
        assert!(lock.is_acquired());
        assert!(!lock.version().is_empty());
        assert_eq!(client.store().len(), 1);

        client.release(&lock).await.expect("release");
        assert!(!lock.is_acquired());
        assert!(client.store().is_empty());
    }

    #[tokio::test]
    async fn test_weak_store_is_rejected() {
        let store = MemoryLockStore::new().with_consistency(ConsistencySettings {
            account_default: ConsistencyLevel::Eventual,
            client_override: None,
        });
        let err = LockClient::new(Arc::new(store), LockScope::new("db", "leases").expect("scope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConsistencyLevel {
                level: ConsistencyLevel::Eventual,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_second_acquire_is_unavailable() {
        let client = client().await;
        let _held = client
            .acquire(&AcquireOptions::new("pk", "job"))
            .await
            .expect("acquire");

        let err = client
            .acquire(&AcquireOptions::new("pk", "job"))
            .await
            .unwrap_err();
        match err {
            Error::LockUnavailable {
                partition_key,
                name,
                attempts,
                source,
            } => {
                assert_eq!(partition_key, "pk");
                assert_eq!(name, "job");
                assert_eq!(attempts, 1);
                assert!(source.is_some_and(|s| s.is_lock_unavailable()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_options_fail_fast() {
        let client = client().await;
        let err = client
            .acquire(&AcquireOptions::new("", "job"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(client.store().is_empty());
    }

    #[tokio::test]
    async fn test_renew_adopts_new_version() {
        let client = client().await;
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job"))
            .await
            .expect("acquire");
        let first = lock.version();

        client.renew(&lock).await.expect("renew");
        assert_ne!(lock.version(), first);
        assert_eq!(
            client.store().version(client.scope(), lock.key()),
            Some(lock.version())
        );
    }

    #[tokio::test]
    async fn test_renew_after_release_is_released() {
        let client = client().await;
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job"))
            .await
            .expect("acquire");
        client.release(&lock).await.expect("release");

        let err = client.renew(&lock).await.unwrap_err();
        assert!(err.is_lock_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_lease_clears_acquired() {
        let client = client().await;
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job").with_lease_duration_secs(5))
            .await
            .expect("acquire");

        client
            .store()
            .delete(client.scope(), lock.key(), &lock.version())
            .await
            .expect("delete");
        assert!(lock.is_acquired());

        assert!(client.renew(&lock).await.unwrap_err().is_lock_released());
        assert!(!lock.is_acquired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_held_revalidates_near_expiry() {
        let client = client().await.with_config(
            LockClientConfig::default()
                .with_liveness(LivenessPolicy::RevalidateWithin(Duration::from_secs(2))),
        );
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job").with_lease_duration_secs(10))
            .await
            .expect("acquire");
        let first = lock.version();

        // Plenty of lease left: trusted locally.
        assert!(client.is_held(&lock).await.expect("held"));
        assert_eq!(lock.version(), first);

        // Near the boundary: confirmed with the store, which renews.
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(client.is_held(&lock).await.expect("held"));
        assert_ne!(lock.version(), first);
        assert_eq!(lock.remaining(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_held_reports_loss_found_by_revalidation() {
        let client = client().await.with_config(
            LockClientConfig::default()
                .with_liveness(LivenessPolicy::RevalidateWithin(Duration::from_secs(60))),
        );
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job").with_lease_duration_secs(10))
            .await
            .expect("acquire");
        client
            .store()
            .delete(client.scope(), lock.key(), &lock.version())
            .await
            .expect("delete");

        assert!(!client.is_held(&lock).await.expect("held"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_clock_policy_never_calls_store() {
        let client = client().await;
        let lock = client
            .acquire(&AcquireOptions::new("pk", "job").with_lease_duration_secs(2))
            .await
            .expect("acquire");
        let version = lock.version();

        assert!(client.is_held(&lock).await.expect("held"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!client.is_held(&lock).await.expect("held"));
        assert_eq!(lock.version(), version);
    }
}
