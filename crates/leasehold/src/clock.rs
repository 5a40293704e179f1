//! Time source used for lease bookkeeping.

use tokio::time::Instant;

/// Source of "now" for lease timestamps and expiry checks.
///
/// Injected into the client and the in-memory store so tests can control time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Follows tokio's paused clock under `#[tokio::test(start_paused = true)]`,
/// so renewal cadence can be tested without real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
