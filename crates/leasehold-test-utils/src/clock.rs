//! Deterministic clocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use leasehold::Clock;
use tokio::time::Instant;

/// Clock that stands still until [`ManualClock::advance`] is called.
///
/// Unlike tokio's paused time it does not move timers, which makes it useful
/// for skew tests: the client and the store can disagree about "now".
#[derive(Debug)]
pub struct ManualClock {
    /// Base time (creation of the clock).
    base: Instant,
    /// Elapsed milliseconds since base.
    elapsed_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the current tokio instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_ms: AtomicU64::new(0),
        }
    }

    /// Advances the clock by `duration`, truncated to whole milliseconds.
    pub fn advance(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).expect("duration fits in u64 ms");
        self.elapsed_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Returns how far the clock has been advanced.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}
