//! Identifiers used throughout OtcBook.
//!
//! Entity ids are plain `u64` sequences assigned transactionally by the
//! owning table (buy orders, sell orders, and deals each advance their own
//! counter; ids are never reused, even for cancelled records). Accounts are
//! opaque names verified by the host's caller-authentication layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An account name. The core never authenticates these; the host proves
/// control of the account before invoking any state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// OrderId / DealId
// ---------------------------------------------------------------------------

/// Order identifier. Buy and sell orders have independent id spaces, so an
/// `OrderId` is only meaningful together with its [`crate::Side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", self.0)
    }
}

/// Deal identifier, global across both order sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DealId(pub u64);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deal:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OrderSn
// ---------------------------------------------------------------------------

/// Caller-supplied idempotency token for deal creation. Unique across all
/// deals ever created; a retried open with the same token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderSn(pub u64);

impl fmt::Display for OrderSn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sn:{}", self.0)
    }
}
