//! Persisted lease records and the keys that address them.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A lease as stored in the backing store.
///
/// `ttl` doubles as the store-side time to live: the store deletes the record
/// on its own once the lease runs out, which is what makes an expired lock
/// acquirable again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    /// Partition the lock lives in.
    pub partition_key: String,

    /// Lock name, unique within the partition.
    #[serde(rename = "id")]
    pub name: String,

    /// Lease duration in seconds.
    #[serde(rename = "ttl")]
    pub lease_duration_secs: u32,
}

impl LockRecord {
    /// Creates a record for the given lock.
    #[must_use]
    pub fn new(
        partition_key: impl Into<String>,
        name: impl Into<String>,
        lease_duration_secs: u32,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            name: name.into(),
            lease_duration_secs,
        }
    }

    /// Returns the uniqueness key of this record.
    #[must_use]
    pub fn key(&self) -> LockKey {
        LockKey::new(&self.partition_key, &self.name)
    }

    /// Encodes the record as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization {
                message: format!("serialize lock record: {e}"),
            })
    }

    /// Decodes a record from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `data` is not a lock record.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::Serialization {
            message: format!("parse lock record: {e}"),
        })
    }
}

/// The `(partition key, name)` pair the store enforces uniqueness on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey {
    /// Partition key.
    pub partition_key: String,
    /// Lock name.
    pub name: String,
}

impl LockKey {
    /// Creates a key.
    #[must_use]
    pub fn new(partition_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.name)
    }
}

/// The database and container lease records are kept in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockScope {
    database: String,
    container: String,
}

impl LockScope {
    /// Creates a scope after validating both names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either name is empty or blank.
    pub fn new(database: impl Into<String>, container: impl Into<String>) -> Result<Self> {
        let database = database.into();
        let container = container.into();
        require_value("database", &database)?;
        require_value("container", &container)?;
        Ok(Self {
            database,
            container,
        })
    }

    /// Returns the database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the container name.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.container)
    }
}

pub(crate) fn require_value(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!(
            "{field} must have a non-empty, non-blank value"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_store_property_names() {
        let record = LockRecord::new("tenant-a", "nightly-report", 60);
        let value: serde_json::Value =
            serde_json::from_slice(&record.to_bytes().expect("encode")).expect("json");

        assert_eq!(value["partitionKey"], "tenant-a");
        assert_eq!(value["id"], "nightly-report");
        assert_eq!(value["ttl"], 60);
        assert_eq!(value.as_object().expect("object").len(), 3);
    }

    #[test]
    fn record_decodes_store_payload() {
        let record =
            LockRecord::from_slice(br#"{"partitionKey":"p","id":"n","ttl":5}"#).expect("decode");
        assert_eq!(record, LockRecord::new("p", "n", 5));
        assert_eq!(record.key().to_string(), "p/n");
    }

    #[test]
    fn malformed_record_is_a_serialization_error() {
        let err = LockRecord::from_slice(b"{\"id\":1}").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn scope_rejects_blank_names() {
        assert!(LockScope::new("db", "leases").is_ok());
        assert!(matches!(
            LockScope::new("", "leases"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            LockScope::new("db", "   "),
            Err(Error::InvalidArgument(_))
        ));
    }
}
