//! Consistency guard.
//!
//! Mutual exclusion through conditional writes is only sound when reads and
//! writes are linearizable. [`verify`] runs once while a
//! [`LockClient`](crate::LockClient) is being constructed and refuses to hand
//! out a client when the store's effective level is weaker than
//! [`ConsistencyLevel::Strong`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Read consistency tiers, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// No ordering guarantees.
    Eventual,
    /// Reads never observe out-of-order writes.
    ConsistentPrefix,
    /// Read-your-writes within a session.
    Session,
    /// Reads lag writes by a bounded window.
    BoundedStaleness,
    /// Linearizable reads and writes.
    Strong,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eventual => "Eventual",
            Self::ConsistentPrefix => "ConsistentPrefix",
            Self::Session => "Session",
            Self::BoundedStaleness => "BoundedStaleness",
            Self::Strong => "Strong",
        };
        f.write_str(name)
    }
}

/// Consistency configuration reported by a store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencySettings {
    /// Account or cluster wide default level.
    pub account_default: ConsistencyLevel,
    /// Level explicitly requested by the client connection, if any.
    pub client_override: Option<ConsistencyLevel>,
}

impl ConsistencySettings {
    /// Settings for a store that is strong at the account level with no override.
    #[must_use]
    pub fn strong() -> Self {
        Self {
            account_default: ConsistencyLevel::Strong,
            client_override: None,
        }
    }

    /// Returns the level requests will actually be served at.
    #[must_use]
    pub fn effective(&self) -> ConsistencyLevel {
        self.client_override
            .map_or(self.account_default, |level| level.min(self.account_default))
    }
}

/// Checks that `settings` yield linearizable operations.
///
/// # Errors
///
/// Returns [`Error::ConsistencyLevel`] if the client override asks for more
/// than the account supports (the store would reject every request), or if
/// the effective level is anything other than strong.
pub fn verify(settings: &ConsistencySettings) -> Result<ConsistencyLevel> {
    if let Some(requested) = settings.client_override {
        if requested > settings.account_default {
            return Err(Error::ConsistencyLevel {
                level: settings.account_default,
                detail: Some(format!(
                    "client requested {requested} but the account only supports {}",
                    settings.account_default
                )),
            });
        }
    }

    let level = settings.effective();
    if level != ConsistencyLevel::Strong {
        return Err(Error::ConsistencyLevel {
            level,
            detail: None,
        });
    }

    tracing::debug!(%level, "store consistency verified");
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_weakest_first() {
        assert!(ConsistencyLevel::Eventual < ConsistencyLevel::ConsistentPrefix);
        assert!(ConsistencyLevel::Session < ConsistencyLevel::BoundedStaleness);
        assert!(ConsistencyLevel::BoundedStaleness < ConsistencyLevel::Strong);
    }

    #[test]
    fn strong_account_without_override_passes() {
        let level = verify(&ConsistencySettings::strong()).expect("strong");
        assert_eq!(level, ConsistencyLevel::Strong);
    }

    #[test]
    fn weaker_account_default_fails() {
        let settings = ConsistencySettings {
            account_default: ConsistencyLevel::Session,
            client_override: None,
        };
        let err = verify(&settings).unwrap_err();
        assert!(matches!(
            err,
            Error::ConsistencyLevel {
                level: ConsistencyLevel::Session,
                detail: None
            }
        ));
    }

    #[test]
    fn override_downgrading_strong_account_fails() {
        let settings = ConsistencySettings {
            account_default: ConsistencyLevel::Strong,
            client_override: Some(ConsistencyLevel::Eventual),
        };
        assert_eq!(settings.effective(), ConsistencyLevel::Eventual);
        let err = verify(&settings).unwrap_err();
        assert!(matches!(
            err,
            Error::ConsistencyLevel {
                level: ConsistencyLevel::Eventual,
                ..
            }
        ));
    }

    #[test]
    fn override_stronger_than_account_is_described() {
        let settings = ConsistencySettings {
            account_default: ConsistencyLevel::BoundedStaleness,
            client_override: Some(ConsistencyLevel::Strong),
        };
        let err = verify(&settings).unwrap_err();
        match err {
            Error::ConsistencyLevel { level, detail } => {
                assert_eq!(level, ConsistencyLevel::BoundedStaleness);
                assert!(detail.expect("detail").contains("requested Strong"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn explicit_strong_override_on_strong_account_passes() {
        let settings = ConsistencySettings {
            account_default: ConsistencyLevel::Strong,
            client_override: Some(ConsistencyLevel::Strong),
        };
        assert!(verify(&settings).is_ok());
    }
}
