//! Backing store adapter contract.
//!
//! A [`LockStore`] is a thin translation layer over a remote conditional-write
//! key/value store. It has no lock logic of its own: it reports the outcomes
//! that carry lock meaning as tagged results and every other failure as
//! [`Error::Storage`](crate::Error::Storage). The client decides what each
//! outcome means for the lock.
//!
//! ## Contract
//!
//! - `create` is atomic and reports [`CreateResult::Conflict`] iff a live,
//!   unexpired record with the same key exists.
//! - `replace` and `delete` honor the expected version token and never treat
//!   a mismatch or a missing record as an error.
//! - Every write submits the record's `ttl` as the store's time to live.
//! - Version tokens are opaque and change on every successful write.

use async_trait::async_trait;

use crate::consistency::ConsistencySettings;
use crate::error::Result;
use crate::record::{LockKey, LockRecord, LockScope};

/// Outcome of a conditional create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResult {
    /// The record was created; the store assigned a fresh version token.
    Created {
        /// New version token.
        version: String,
    },
    /// A live record with the same key already exists.
    Conflict,
}

/// Outcome of a conditional replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceResult {
    /// The record was replaced.
    Replaced {
        /// New version token.
        version: String,
    },
    /// A record exists but its version token differs.
    PreconditionFailed,
    /// No live record exists at the key.
    NotFound,
}

/// Outcome of a conditional delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// The record was deleted.
    Deleted,
    /// A record exists but its version token differs.
    PreconditionFailed,
    /// No live record exists at the key.
    NotFound,
}

/// Conditional-write store holding lease records.
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    /// Creates `record` only if no live record with the same key exists.
    async fn create(&self, scope: &LockScope, record: &LockRecord) -> Result<CreateResult>;

    /// Replaces the record at `key` only if its version equals `expected_version`.
    async fn replace(
        &self,
        scope: &LockScope,
        key: &LockKey,
        record: &LockRecord,
        expected_version: &str,
    ) -> Result<ReplaceResult>;

    /// Deletes the record at `key` only if its version equals `expected_version`.
    async fn delete(
        &self,
        scope: &LockScope,
        key: &LockKey,
        expected_version: &str,
    ) -> Result<DeleteResult>;

    /// Reports the consistency configuration of the connection.
    async fn consistency(&self) -> Result<ConsistencySettings>;
}
