//! Background lease renewal.
//!
//! A renewal task keeps a lease alive for a caller that opted into
//! auto-renewal. It fires every third of the lease duration, which leaves
//! room for two more attempts after a transient failure before the lease can
//! run out. Each rearm subtracts the time the renewal itself took, so the
//! cadence stays anchored to the lease boundary instead of drifting later
//! with every round trip.
//!
//! ```text
//! Scheduled --delay--> Firing --renew--> Scheduled
//!     |                   |
//!     +--release/drop-----+--not acquired--> Stopped
//! ```
//!
//! A failed renewal does not stop the task. Only release, dropping the handle,
//! or the local expiry check does. A renewal that finds the lease gone marks
//! the handle lost, so that check fails on the next firing.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::LockClient;
use crate::lock::{Lock, LockShared};
use crate::observability::lock_span;
use crate::store::LockStore;

/// Handle to a running renewal task, owned by the lock it renews.
pub(crate) struct RenewalTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RenewalTask {
    /// Stops the task. It never issues another renewal after this returns.
    pub(crate) fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Returns the delay before the first renewal.
pub(crate) fn first_delay(lease: Duration) -> Duration {
    lease / 3
}

/// Returns the delay before the next renewal given how long the last one took.
pub(crate) fn next_delay(lease: Duration, elapsed: Duration, floor: Duration) -> Duration {
    first_delay(lease).saturating_sub(elapsed).max(floor)
}

/// Spawns a renewal task for `lock` on the current tokio runtime.
pub(crate) fn spawn<S>(client: LockClient<S>, lock: &Lock) -> RenewalTask
where
    S: LockStore + ?Sized,
{
    let cancel = CancellationToken::new();
    let span = lock_span("auto_renew", lock.partition_key(), lock.name());
    let handle = tokio::spawn(
        run(client, Arc::downgrade(&lock.shared), cancel.clone()).instrument(span),
    );
    RenewalTask { cancel, handle }
}

async fn run<S>(client: LockClient<S>, weak: Weak<LockShared>, cancel: CancellationToken)
where
    S: LockStore + ?Sized,
{
    let Some(lease) = weak.upgrade().map(|shared| shared.lease_duration()) else {
        return;
    };
    let floor = client.config().renewal_floor;
    let mut delay = first_delay(lease);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("renewal stopped");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }

        let Some(shared) = weak.upgrade() else {
            tracing::debug!("lock handle dropped, renewal stopped");
            return;
        };
        let lock = Lock::from_shared(shared);

        if !lock.is_acquired() {
            lock.shared.state().renewal = None;
            tracing::debug!("lease no longer held locally, renewal stopped");
            return;
        }

        let started = client.clock().now();
        match client.renew(&lock).await {
            Ok(()) => tracing::debug!(version = %lock.version(), "lease renewed"),
            Err(e) if e.is_lock_released() => tracing::info!("lease gone, renewal will stop"),
            Err(e) => tracing::warn!(error = %e, "lease renewal failed, will retry"),
        }
        let elapsed = client.clock().now().saturating_duration_since(started);
        delay = next_delay(lease, elapsed, floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_is_a_third_of_the_lease() {
        assert_eq!(first_delay(Duration::from_secs(3)), Duration::from_secs(1));
        assert_eq!(
            first_delay(Duration::from_secs(2)),
            Duration::from_nanos(666_666_666)
        );
    }

    #[test]
    fn next_delay_compensates_for_latency() {
        let lease = Duration::from_secs(3);
        let floor = Duration::from_millis(1);
        assert_eq!(
            next_delay(lease, Duration::from_millis(250), floor),
            Duration::from_millis(750)
        );
        assert_eq!(next_delay(lease, Duration::ZERO, floor), Duration::from_secs(1));
    }

    #[test]
    fn next_delay_never_drops_below_floor() {
        let lease = Duration::from_secs(3);
        let floor = Duration::from_millis(100);
        assert_eq!(next_delay(lease, Duration::from_secs(5), floor), floor);
        assert_eq!(next_delay(lease, Duration::from_millis(950), floor), floor);
    }
}
