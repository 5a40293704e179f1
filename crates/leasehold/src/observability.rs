//! Logging setup and span helpers.
//!
//! Every lock operation runs inside a span carrying the operation name,
//! partition key and lock name, so store calls and renewal attempts can be
//! correlated in the logs.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Default filter when `RUST_LOG` is unset: the lock client's own events at
/// info (acquire, release, lost leases), everything else at warn.
pub const DEFAULT_FILTER: &str = "warn,leasehold=info";

/// Installs a global `tracing` subscriber for processes that hold locks.
///
/// The library itself only emits events inside [`lock_span`]s; applications
/// that already install a subscriber should skip this. Only the first call
/// has an effect, and an existing global subscriber is left in place.
///
/// Renewal failures are logged at warn and lost leases at info, so the
/// default filter is enough to see why a holder stopped holding.
///
/// # Example
///
/// ```rust
/// use leasehold::observability::{LogFormat, init_logging};
///
/// // Honors RUST_LOG, e.g. RUST_LOG=leasehold=debug to trace every renewal.
/// init_logging(LogFormat::Json);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(env_filter);

        let _ = match format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_current_span(true))
                .try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        };
    });
}

/// Creates a span for an operation on one lock.
///
/// # Example
///
/// ```rust
/// use leasehold::observability::lock_span;
///
/// let span = lock_span("acquire", "tenant-a", "nightly-report");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn lock_span(operation: &str, partition_key: &str, name: &str) -> Span {
    tracing::info_span!(
        "lock",
        op = operation,
        partition_key = partition_key,
        name = name,
    )
}
