//! Test doubles for exercising leasehold's lock protocol.
//!
//! Lock behavior is mostly about which conditional writes reach the store,
//! with which version token, and when. The helpers here make that observable:
//! - [`TracingLockStore`] logs every create/replace/delete as a [`StoreOp`],
//!   can fail a whole class of calls ([`FailOn`]) and can add latency so a
//!   renewal is still in flight when the test acts
//! - [`ManualClock`] lets the client's idea of "now" drift from the store's
//! - [`tracing_client`] and the option builders cut per-test setup
//!
//! Timing tests are meant to run under `#[tokio::test(start_paused = true)]`,
//! where store latency and renewal delays advance deterministically.
//!
//! ```rust,ignore
//! use leasehold_test_utils::{options, tracing_client};
//!
//! #[tokio::test(start_paused = true)]
//! async fn renews_in_the_background() {
//!     let (client, store) = tracing_client().await;
//!     let _lock = client
//!         .acquire(&options("job", 3).with_auto_renew(true))
//!         .await
//!         .expect("acquire");
//!     tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
//!     assert_eq!(store.replace_calls(), 1);
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod clock;
pub mod fixtures;
pub mod store;

pub use clock::*;
pub use fixtures::*;
pub use store::*;

/// Routes leasehold's debug events to the test harness output.
///
/// Safe to call from every test; later calls are ignored.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("leasehold=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
