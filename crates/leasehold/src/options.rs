//! Caller-supplied options for acquiring a lock.

use std::time::Duration;

use crate::config::LockClientConfig;
use crate::error::{Error, Result};
use crate::record::{LockRecord, require_value};

/// Default lease duration in seconds.
pub const DEFAULT_LEASE_DURATION_SECS: u32 = 60;

/// Default wait between acquisition attempts.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(1000);

/// How a lock should be acquired.
///
/// ```rust
/// use std::time::Duration;
///
/// use leasehold::AcquireOptions;
///
/// let options = AcquireOptions::new("tenant-a", "nightly-report")
///     .with_lease_duration_secs(30)
///     .with_timeout(Duration::from_secs(10))
///     .with_auto_renew(true);
/// assert_eq!(options.retry_wait, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Partition key of the lock.
    pub partition_key: String,
    /// Lock name, unique within the partition.
    pub lock_name: String,
    /// Lease duration in seconds; also the record's store-side TTL.
    pub lease_duration_secs: u32,
    /// How long to keep retrying. Zero means a single attempt.
    pub timeout: Duration,
    /// Wait between attempts.
    pub retry_wait: Duration,
    /// Whether to renew the lease in the background.
    pub auto_renew: bool,
}

impl AcquireOptions {
    /// Creates options with default lease, timeout, retry wait and no auto-renew.
    #[must_use]
    pub fn new(partition_key: impl Into<String>, lock_name: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            lock_name: lock_name.into(),
            lease_duration_secs: DEFAULT_LEASE_DURATION_SECS,
            timeout: Duration::ZERO,
            retry_wait: DEFAULT_RETRY_WAIT,
            auto_renew: false,
        }
    }

    /// Creates options seeded from a client configuration's defaults.
    #[must_use]
    pub fn from_config(
        config: &LockClientConfig,
        partition_key: impl Into<String>,
        lock_name: impl Into<String>,
    ) -> Self {
        Self {
            lease_duration_secs: config.default_lease_duration_secs,
            retry_wait: config.default_retry_wait,
            ..Self::new(partition_key, lock_name)
        }
    }

    /// Sets the lease duration in seconds.
    #[must_use]
    pub fn with_lease_duration_secs(mut self, secs: u32) -> Self {
        self.lease_duration_secs = secs;
        self
    }

    /// Sets how long acquisition keeps retrying.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the wait between attempts.
    #[must_use]
    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    /// Enables or disables background renewal.
    #[must_use]
    pub fn with_auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    /// Checks the options before any store call is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the partition key or lock name is
    /// blank, the lease duration is zero, or a retry window is configured with
    /// a zero retry wait.
    pub fn validate(&self) -> Result<()> {
        require_value("partition_key", &self.partition_key)?;
        require_value("lock_name", &self.lock_name)?;
        if self.lease_duration_secs == 0 {
            return Err(Error::invalid_argument(
                "lease_duration_secs must be greater than zero",
            ));
        }
        if !self.timeout.is_zero() && self.retry_wait.is_zero() {
            return Err(Error::invalid_argument(
                "retry_wait must be greater than zero when a timeout is set",
            ));
        }
        Ok(())
    }

    /// Returns the lease duration.
    #[must_use]
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.lease_duration_secs))
    }

    pub(crate) fn record(&self) -> LockRecord {
        LockRecord::new(
            &self.partition_key,
            &self.lock_name,
            self.lease_duration_secs,
        )
    }
}
