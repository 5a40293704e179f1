//! Error types and result aliases for leasehold.
//!
//! Only the store outcomes with an unambiguous lock meaning become lock
//! errors ([`Error::LockUnavailable`], [`Error::LockReleased`]). Everything
//! else the store reports surfaces as [`Error::Storage`] so callers can tell
//! "the lock is contended" apart from "the store is broken".

use crate::consistency::ConsistencyLevel;

/// The result type used throughout leasehold.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in leasehold operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied an invalid argument. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store cannot provide linearizable reads and writes.
    #[error("a consistency level of \"{level}\" is not supported, use consistency level Strong{}", detail_suffix(.detail))]
    ConsistencyLevel {
        /// The detected, insufficient level.
        level: ConsistencyLevel,
        /// Extra context about how the level was detected.
        detail: Option<String>,
    },

    /// The lock is held by someone else.
    #[error("the lock with partition key \"{partition_key}\" and name \"{name}\" is unavailable")]
    LockUnavailable {
        /// Partition key of the contended lock.
        partition_key: String,
        /// Name of the contended lock.
        name: String,
        /// Number of create attempts made before giving up.
        attempts: u32,
        /// The error from the last attempt, if any.
        #[source]
        source: Option<Box<Error>>,
    },

    /// The lease is gone: it expired, was released, or a new epoch owns the key.
    #[error(
        "the lock with partition key \"{partition_key}\" and name \"{name}\" has been released/expired and no longer exists"
    )]
    LockReleased {
        /// Partition key of the lost lock.
        partition_key: String,
        /// Name of the lost lock.
        name: String,
    },

    /// A store operation failed for a reason with no lock meaning.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lock record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// Acquisition was cancelled by the caller before it completed.
    #[error("acquiring the lock with partition key \"{partition_key}\" and name \"{name}\" was cancelled")]
    Cancelled {
        /// Partition key of the lock being acquired.
        partition_key: String,
        /// Name of the lock being acquired.
        name: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

#[allow(clippy::ref_option)]
fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

impl Error {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for the expected outcome of losing an acquire race.
    #[must_use]
    pub fn is_lock_unavailable(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. })
    }

    /// Returns true when a renew found the lease gone.
    #[must_use]
    pub fn is_lock_released(&self) -> bool {
        matches!(self, Self::LockReleased { .. })
    }
}
