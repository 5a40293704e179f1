//! Client-side lock handles.
//!
//! A [`Lock`] is the caller's view of a lease it won. The store is the
//! authority on who owns a key; the handle only remembers the version token
//! of its last successful write and when that write started, and derives a
//! local "still acquired" answer from the clock.
//!
//! # Concurrency
//!
//! The mutable fields (token, timestamp, flags, renewal task) live behind a
//! single `std::sync::Mutex` so predicate reads always see one consistent
//! snapshot. Store writes against a handle (renew and release) additionally
//! pass through an async gate, one at a time, so a background renewal and a
//! caller-driven call never present the same token concurrently.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::clock::Clock;
use crate::record::{LockKey, LockRecord, LockScope};
use crate::renewal::RenewalTask;

/// A held (or formerly held) lease on a named lock.
///
/// Dropping the last handle stops its background renewal; the lease then
/// runs out through the store's TTL.
pub struct Lock {
    pub(crate) shared: Arc<LockShared>,
}

pub(crate) struct LockShared {
    pub(crate) scope: LockScope,
    pub(crate) key: LockKey,
    pub(crate) lease_duration_secs: u32,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) gate: tokio::sync::Mutex<()>,
    state: Mutex<LeaseState>,
}

pub(crate) struct LeaseState {
    pub(crate) version: String,
    pub(crate) time_acquired: Instant,
    pub(crate) released: bool,
    /// Set when the store reported the lease gone during a renew.
    pub(crate) lost: bool,
    pub(crate) renewal: Option<RenewalTask>,
}

impl LeaseState {
    fn is_acquired(&self, now: Instant, lease: Duration) -> bool {
        !self.released && !self.lost && now.saturating_duration_since(self.time_acquired) < lease
    }
}

impl Lock {
    pub(crate) fn new(
        scope: LockScope,
        record: &LockRecord,
        version: String,
        time_acquired: Instant,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(LockShared {
                scope,
                key: record.key(),
                lease_duration_secs: record.lease_duration_secs,
                clock,
                gate: tokio::sync::Mutex::new(()),
                state: Mutex::new(LeaseState {
                    version,
                    time_acquired,
                    released: false,
                    lost: false,
                    renewal: None,
                }),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<LockShared>) -> Self {
        Self { shared }
    }

    /// Returns the partition key.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        &self.shared.key.partition_key
    }

    /// Returns the lock name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.key.name
    }

    /// Returns the store key of this lock.
    #[must_use]
    pub fn key(&self) -> &LockKey {
        &self.shared.key
    }

    /// Returns the scope the lease record lives in.
    #[must_use]
    pub fn scope(&self) -> &LockScope {
        &self.shared.scope
    }

    /// Returns the lease duration in seconds.
    #[must_use]
    pub fn lease_duration_secs(&self) -> u32 {
        self.shared.lease_duration_secs
    }

    /// Returns the lease duration.
    #[must_use]
    pub fn lease_duration(&self) -> Duration {
        self.shared.lease_duration()
    }

    /// Returns the version token of the most recent successful write.
    #[must_use]
    pub fn version(&self) -> String {
        self.shared.state().version.clone()
    }

    /// Returns when the current lease window started, on the client's clock.
    #[must_use]
    pub fn time_acquired(&self) -> Instant {
        self.shared.state().time_acquired
    }

    /// Returns whether the lease is still held according to the local clock.
    ///
    /// This is an approximation: the store may already have expired the
    /// record, for example under clock skew or a long pause.
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.shared.is_acquired()
    }

    /// Returns how much of the lease remains locally, zero once not acquired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        let now = self.shared.clock.now();
        let lease = self.lease_duration();
        let state = self.shared.state();
        if !state.is_acquired(now, lease) {
            return Duration::ZERO;
        }
        lease.saturating_sub(now.saturating_duration_since(state.time_acquired))
    }

    /// Returns whether a background renewal task is attached.
    #[must_use]
    pub fn is_auto_renewing(&self) -> bool {
        self.shared.state().renewal.is_some()
    }

    pub(crate) fn record(&self) -> LockRecord {
        LockRecord::new(
            &self.shared.key.partition_key,
            &self.shared.key.name,
            self.shared.lease_duration_secs,
        )
    }
}

impl LockShared {
    pub(crate) fn state(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lease_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.lease_duration_secs))
    }

    pub(crate) fn is_acquired(&self) -> bool {
        let now = self.clock.now();
        self.state().is_acquired(now, self.lease_duration())
    }
}

impl Drop for LockShared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.renewal.take() {
            task.stop();
        }
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state();
        f.debug_struct("Lock")
            .field("scope", &self.shared.scope)
            .field("key", &self.shared.key)
            .field("lease_duration_secs", &self.shared.lease_duration_secs)
            .field("version", &state.version)
            .field("released", &state.released)
            .field("lost", &state.lost)
            .field("auto_renewing", &state.renewal.is_some())
            .finish_non_exhaustive()
    }
}
