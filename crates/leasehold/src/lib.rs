//! # leasehold
//!
//! Distributed lease locks over a strongly-consistent, conditional-write
//! document store.
//!
//! A lock is a small record keyed by `(partition_key, name)`. Whoever creates
//! the record holds the lock for a lease; every write returns an opaque
//! version token, and renew and release are conditional on the token of the
//! holder's last write. The record carries the lease as its TTL, so a holder
//! that disappears gives the lock up when the store expires the record.
//!
//! - **Client**: [`LockClient`] acquires, renews and releases locks
//! - **Handles**: [`Lock`] tracks one held lease and its local expiry
//! - **Store seam**: [`LockStore`] is the conditional-write contract a backend
//!   implements; [`MemoryLockStore`] is an in-process implementation
//! - **Blocking use**: [`blocking::LockClient`] for synchronous callers
//!
//! ## Safety model
//!
//! Mutual exclusion holds as long as the store is strongly consistent (checked
//! when the client is built) and a holder stops working on a lock once
//! [`Lock::is_acquired`] turns false. The local check is an approximation:
//! clock skew or a long pause can let the store expire the record first.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use leasehold::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> leasehold::Result<()> {
//! let store = Arc::new(MemoryLockStore::new());
//! let client = LockClient::new(store, LockScope::new("app", "leases")?).await?;
//!
//! let options = AcquireOptions::new("tenant-a", "compaction")
//!     .with_lease_duration_secs(30)
//!     .with_timeout(Duration::from_secs(5))
//!     .with_auto_renew(true);
//! let lock = client.acquire(&options).await?;
//! assert!(lock.is_auto_renewing());
//!
//! client.release(&lock).await?;
//! assert!(!lock.is_acquired());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod blocking;
pub mod client;
pub mod clock;
pub mod config;
pub mod consistency;
pub mod error;
pub mod lock;
pub mod memory;
pub mod observability;
pub mod options;
pub mod record;
mod renewal;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use leasehold::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::LockClient;
    pub use crate::config::{LivenessPolicy, LockClientConfig};
    pub use crate::error::{Error, Result};
    pub use crate::lock::Lock;
    pub use crate::memory::MemoryLockStore;
    pub use crate::options::AcquireOptions;
    pub use crate::record::{LockKey, LockScope};
    pub use crate::store::LockStore;
}

// Re-export key types at crate root for ergonomics
pub use client::LockClient;
pub use clock::{Clock, TokioClock};
pub use config::{LivenessPolicy, LockClientConfig};
pub use consistency::{ConsistencyLevel, ConsistencySettings};
pub use error::{Error, Result};
pub use lock::Lock;
pub use memory::MemoryLockStore;
pub use observability::{LogFormat, init_logging};
pub use options::AcquireOptions;
pub use record::{LockKey, LockRecord, LockScope};
pub use store::{CreateResult, DeleteResult, LockStore, ReplaceResult};
pub use tokio_util::sync::CancellationToken;
