//! Balance tracking types for the OtcBook collateral model.
//!
//! Every merchant has, per asset, an `available` amount (usable for new
//! stakes and withdrawal) and a `frozen` amount (locked as collateral
//! behind running orders).

use serde::{Deserialize, Serialize};

/// A single balance entry for a (merchant, symbol) pair. Raw amounts in the
/// symbol's declared precision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new stakes / withdrawal.
    pub available: i64,
    /// Frozen as collateral behind running orders.
    pub frozen: i64,
}

impl BalanceEntry {
    /// Total balance (available + frozen).
    #[must_use]
    pub fn total(&self) -> i64 {
        self.available + self.frozen
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.frozen == 0
    }
}
