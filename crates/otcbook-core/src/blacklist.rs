//! Blacklist gate: blocks banned takers from opening new deals.
//!
//! Entries auto-expire: an entry whose expiry has passed no longer blocks
//! and is purged lazily the next time the account is consulted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use otcbook_types::{AccountId, OtcError, Result};

/// Account → blacklist expiry.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Blacklist {
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl Blacklist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh an entry.
    pub fn set(&mut self, account: &AccountId, until: DateTime<Utc>) {
        self.entries.insert(account.as_str().to_string(), until);
    }

    /// Drop an entry (no-op if absent).
    pub fn remove(&mut self, account: &AccountId) {
        self.entries.remove(account.as_str());
    }

    /// Whether the account is currently blocked.
    #[must_use]
    pub fn is_blocked(&self, account: &AccountId, now: DateTime<Utc>) -> bool {
        self.entries
            .get(account.as_str())
            .is_some_and(|until| *until > now)
    }

    /// Gate used by `open_deal`: pass if clear, purge if expired.
    ///
    /// # Errors
    /// `TakerBlacklisted` while the entry's expiry lies in the future.
    pub fn ensure_clear(&mut self, account: &AccountId, now: DateTime<Utc>) -> Result<()> {
        match self.entries.get(account.as_str()) {
            Some(until) if *until > now => Err(OtcError::TakerBlacklisted {
                account: account.clone(),
                until: *until,
            }),
            Some(_) => {
                self.entries.remove(account.as_str());
                Ok(())
            }
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
