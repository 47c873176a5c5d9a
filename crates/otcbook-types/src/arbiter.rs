//! Arbiter records: lifetime case counters for dispute resolution.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A registered dispute arbiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arbiter {
    pub account: AccountId,
    pub email: String,
    /// Resolutions that closed the deal with a fine against the maker.
    pub closed_case_num: u64,
    /// Resolutions in the taker's favor (deal cancelled, no fine).
    pub failed_case_num: u64,
    /// Cumulative arbitrated quantity, raw units.
    pub total_amount: i64,
}

impl Arbiter {
    #[must_use]
    pub fn new(account: AccountId, email: impl Into<String>) -> Self {
        Self {
            account,
            email: email.into(),
            closed_case_num: 0,
            failed_case_num: 0,
            total_amount: 0,
        }
    }

    /// Record a resolved case. `closed` is true for the fine branch.
    pub fn record_case(&mut self, closed: bool, amount: i64) {
        if closed {
            self.closed_case_num += 1;
        } else {
            self.failed_case_num += 1;
        }
        self.total_amount = self.total_amount.saturating_add(amount);
    }
}
