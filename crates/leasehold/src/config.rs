//! Client configuration.
//!
//! Values can be loaded from the process environment:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `LEASEHOLD_RENEWAL_FLOOR_MS` | `1` | Shortest delay between background renewals |
//! | `LEASEHOLD_DEFAULT_LEASE_SECS` | `60` | Lease duration used by [`AcquireOptions::from_config`](crate::AcquireOptions::from_config) |
//! | `LEASEHOLD_DEFAULT_RETRY_WAIT_MS` | `1000` | Retry wait used by [`AcquireOptions::from_config`](crate::AcquireOptions::from_config) |
//! | `LEASEHOLD_REVALIDATE_WITHIN_MS` | unset | Enables [`LivenessPolicy::RevalidateWithin`] |

use std::time::Duration;

use crate::error::{Error, Result};
use crate::options::{DEFAULT_LEASE_DURATION_SECS, DEFAULT_RETRY_WAIT};

const ENV_RENEWAL_FLOOR_MS: &str = "LEASEHOLD_RENEWAL_FLOOR_MS";
const ENV_DEFAULT_LEASE_SECS: &str = "LEASEHOLD_DEFAULT_LEASE_SECS";
const ENV_DEFAULT_RETRY_WAIT_MS: &str = "LEASEHOLD_DEFAULT_RETRY_WAIT_MS";
const ENV_REVALIDATE_WITHIN_MS: &str = "LEASEHOLD_REVALIDATE_WITHIN_MS";

/// Default shortest delay between background renewals.
pub const DEFAULT_RENEWAL_FLOOR: Duration = Duration::from_millis(1);

/// How [`LockClient::is_held`](crate::LockClient::is_held) decides whether a
/// lease is still owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LivenessPolicy {
    /// Trust the local clock alone.
    #[default]
    LocalClock,
    /// Confirm ownership with the store (through a conditional renew) once
    /// less than the given margin remains on the local lease.
    RevalidateWithin(Duration),
}

/// Configuration for a [`LockClient`](crate::LockClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockClientConfig {
    /// Shortest delay the renewal scheduler rearms with, even when a renewal
    /// took longer than a third of the lease.
    pub renewal_floor: Duration,
    /// Liveness policy for [`LockClient::is_held`](crate::LockClient::is_held).
    pub liveness: LivenessPolicy,
    /// Lease duration seeded into options built from this config.
    pub default_lease_duration_secs: u32,
    /// Retry wait seeded into options built from this config.
    pub default_retry_wait: Duration,
}

impl Default for LockClientConfig {
    fn default() -> Self {
        Self {
            renewal_floor: DEFAULT_RENEWAL_FLOOR,
            liveness: LivenessPolicy::LocalClock,
            default_lease_duration_secs: DEFAULT_LEASE_DURATION_SECS,
            default_retry_wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl LockClientConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is set but is not a positive
    /// integer in range.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration with a custom environment source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is set but is not a positive
    /// integer in range.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let renewal_floor = parse_positive_u64_env(&get_env, ENV_RENEWAL_FLOOR_MS)?
            .map_or(defaults.renewal_floor, Duration::from_millis);
        let default_retry_wait = parse_positive_u64_env(&get_env, ENV_DEFAULT_RETRY_WAIT_MS)?
            .map_or(defaults.default_retry_wait, Duration::from_millis);
        let liveness = parse_positive_u64_env(&get_env, ENV_REVALIDATE_WITHIN_MS)?
            .map_or(defaults.liveness, |ms| {
                LivenessPolicy::RevalidateWithin(Duration::from_millis(ms))
            });
        let default_lease_duration_secs =
            match parse_positive_u64_env(&get_env, ENV_DEFAULT_LEASE_SECS)? {
                Some(secs) => u32::try_from(secs).map_err(|_| Error::Config {
                    message: format!(
                        "{ENV_DEFAULT_LEASE_SECS} value {secs} exceeds supported range"
                    ),
                })?,
                None => defaults.default_lease_duration_secs,
            };

        Ok(Self {
            renewal_floor,
            liveness,
            default_lease_duration_secs,
            default_retry_wait,
        })
    }

    /// Sets the liveness policy.
    #[must_use]
    pub fn with_liveness(mut self, liveness: LivenessPolicy) -> Self {
        self.liveness = liveness;
        self
    }

    /// Sets the shortest renewal delay.
    #[must_use]
    pub fn with_renewal_floor(mut self, floor: Duration) -> Self {
        self.renewal_floor = floor;
        self
    }
}

fn parse_positive_u64_env<F>(get_env: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(None);
    };

    let parsed = raw.trim().parse::<u64>().map_err(|_| Error::Config {
        message: format!("{key} must be a positive integer, got '{raw}'"),
    })?;
    if parsed == 0 {
        return Err(Error::Config {
            message: format!("{key} must be greater than zero"),
        });
    }
    Ok(Some(parsed))
}
