//! In-memory [`LockStore`] with store-side TTL expiry.
//!
//! Thread-safe via `RwLock`. Not suitable for production: it exists so the
//! lock protocol can be exercised end to end without a remote store. Expiry is
//! checked against an injected [`Clock`], which stands in for the remote
//! store's own TTL sweeper: expired records are invisible to every call and
//! are swept out of the map on each successful `create`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use ulid::Ulid;

use crate::clock::{Clock, TokioClock};
use crate::consistency::ConsistencySettings;
use crate::error::{Error, Result};
use crate::record::{LockKey, LockRecord, LockScope};
use crate::store::{CreateResult, DeleteResult, LockStore, ReplaceResult};

type StoreKey = (LockScope, LockKey);

/// In-memory lease store for tests and local development.
pub struct MemoryLockStore {
    records: RwLock<HashMap<StoreKey, StoredRecord>>,
    clock: Arc<dyn Clock>,
    consistency: ConsistencySettings,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    data: Bytes,
    version: String,
    expires_at: Instant,
}

impl std::fmt::Debug for MemoryLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLockStore")
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLockStore {
    /// Creates an empty, strongly consistent store on the tokio clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(TokioClock))
    }

    /// Creates an empty store that expires records against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
            consistency: ConsistencySettings::strong(),
        }
    }

    /// Overrides the consistency settings the store reports.
    #[must_use]
    pub fn with_consistency(mut self, consistency: ConsistencySettings) -> Self {
        self.consistency = consistency;
        self
    }

    /// Returns the live record at `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be decoded.
    pub fn get(&self, scope: &LockScope, key: &LockKey) -> Result<Option<LockRecord>> {
        let now = self.clock.now();
        let records = self.records.read().map_err(|_| poisoned())?;
        records
            .get(&(scope.clone(), key.clone()))
            .filter(|r| r.is_live(now))
            .map(|r| LockRecord::from_slice(&r.data))
            .transpose()
    }

    /// Returns the version token of the live record at `key`, if any.
    #[must_use]
    pub fn version(&self, scope: &LockScope, key: &LockKey) -> Option<String> {
        let now = self.clock.now();
        let records = self.records.read().ok()?;
        records
            .get(&(scope.clone(), key.clone()))
            .filter(|r| r.is_live(now))
            .map(|r| r.version.clone())
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.records
            .read()
            .map(|records| records.values().filter(|r| r.is_live(now)).count())
            .unwrap_or_default()
    }

    /// Returns true if no live records exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stored(&self, record: &LockRecord, now: Instant) -> Result<StoredRecord> {
        Ok(StoredRecord {
            data: record.to_bytes()?,
            version: Ulid::new().to_string(),
            expires_at: now + Duration::from_secs(u64::from(record.lease_duration_secs)),
        })
    }
}

impl StoredRecord {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn create(&self, scope: &LockScope, record: &LockRecord) -> Result<CreateResult> {
        let now = self.clock.now();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let key = (scope.clone(), record.key());

        if records.get(&key).is_some_and(|r| r.is_live(now)) {
            return Ok(CreateResult::Conflict);
        }
        records.retain(|_, r| r.is_live(now));

        let stored = self.stored(record, now)?;
        let version = stored.version.clone();
        records.insert(key, stored);
        drop(records);

        Ok(CreateResult::Created { version })
    }

    async fn replace(
        &self,
        scope: &LockScope,
        key: &LockKey,
        record: &LockRecord,
        expected_version: &str,
    ) -> Result<ReplaceResult> {
        let now = self.clock.now();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let key = (scope.clone(), key.clone());

        match records.get(&key) {
            Some(current) if current.is_live(now) => {
                if current.version != expected_version {
                    return Ok(ReplaceResult::PreconditionFailed);
                }
            }
            Some(_) => {
                records.remove(&key);
                return Ok(ReplaceResult::NotFound);
            }
            None => return Ok(ReplaceResult::NotFound),
        }

        let stored = self.stored(record, now)?;
        let version = stored.version.clone();
        records.insert(key, stored);
        drop(records);

        Ok(ReplaceResult::Replaced { version })
    }

    async fn delete(
        &self,
        scope: &LockScope,
        key: &LockKey,
        expected_version: &str,
    ) -> Result<DeleteResult> {
        let now = self.clock.now();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let key = (scope.clone(), key.clone());

        let outcome = match records.get(&key) {
            Some(current) if !current.is_live(now) => {
                records.remove(&key);
                DeleteResult::NotFound
            }
            Some(current) if current.version != expected_version => {
                DeleteResult::PreconditionFailed
            }
            Some(_) => {
                records.remove(&key);
                DeleteResult::Deleted
            }
            None => DeleteResult::NotFound,
        };
        Ok(outcome)
    }

    async fn consistency(&self) -> Result<ConsistencySettings> {
        Ok(self.consistency)
    }
}
