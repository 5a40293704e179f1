//! Synchronous facade over [`crate::LockClient`].
//!
//! The blocking client owns a small tokio runtime. Background renewals run on
//! its worker thread, so auto-renewed locks stay alive between calls.
//!
//! These methods must not be called from inside an async runtime; use the
//! async client there.

use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::client;
use crate::config::LockClientConfig;
use crate::error::{Error, Result};
use crate::lock::Lock;
use crate::options::AcquireOptions;
use crate::record::LockScope;
use crate::store::LockStore;

/// Blocking lock client.
pub struct LockClient<S: LockStore + ?Sized> {
    inner: client::LockClient<S>,
    runtime: Runtime,
}

impl<S: LockStore + ?Sized> std::fmt::Debug for LockClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockClient")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: LockStore + ?Sized> LockClient<S> {
    /// Creates a client after verifying the store is strongly consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the runtime cannot be started, otherwise
    /// the same errors as [`client::LockClient::new`].
    pub fn new(store: Arc<S>, scope: LockScope) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("leasehold-renewal")
            .enable_all()
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to start lock client runtime: {e}"),
            })?;
        let inner = runtime.block_on(client::LockClient::new(store, scope))?;
        Ok(Self { inner, runtime })
    }

    /// Sets client configuration.
    #[must_use]
    pub fn with_config(mut self, config: LockClientConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }

    /// Returns the async client this facade drives.
    #[must_use]
    pub fn inner(&self) -> &client::LockClient<S> {
        &self.inner
    }

    /// Blocking [`client::LockClient::acquire`].
    ///
    /// # Errors
    ///
    /// Same as [`client::LockClient::acquire`].
    pub fn acquire(&self, options: &AcquireOptions) -> Result<Lock> {
        self.runtime.block_on(self.inner.acquire(options))
    }

    /// Blocking [`client::LockClient::renew`].
    ///
    /// # Errors
    ///
    /// Same as [`client::LockClient::renew`].
    pub fn renew(&self, lock: &Lock) -> Result<()> {
        self.runtime.block_on(self.inner.renew(lock))
    }

    /// Blocking [`client::LockClient::release`].
    ///
    /// # Errors
    ///
    /// Same as [`client::LockClient::release`].
    pub fn release(&self, lock: &Lock) -> Result<()> {
        self.runtime.block_on(self.inner.release(lock))
    }

    /// Blocking [`client::LockClient::is_held`].
    ///
    /// # Errors
    ///
    /// Same as [`client::LockClient::is_held`].
    pub fn is_held(&self, lock: &Lock) -> Result<bool> {
        self.runtime.block_on(self.inner.is_held(lock))
    }
}
