//! Merchant accounts: tier, contact fields, and per-asset balances.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_DETAIL_LEN, MAX_EMAIL_LEN, MAX_MEMO_LEN, MAX_NAME_LEN, WITHDRAW_HOLD_BASIC_SECS,
    WITHDRAW_HOLD_BLUESHIELD_SECS, WITHDRAW_HOLD_DIAMOND_SECS, WITHDRAW_HOLD_GOLD_SECS,
};
use crate::{AccountId, BalanceEntry, OtcError, Result, Symbol};

/// Merchant standing. Only enabled tiers may post orders or deposit;
/// a `Disabled` merchant may still withdraw what they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MerchantTier {
    Registered,
    Basic,
    Gold,
    Diamond,
    BlueShield,
    Disabled,
    Rejected,
}

impl MerchantTier {
    /// Tiers allowed to post orders, open stakes, and deposit.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(
            self,
            Self::Basic | Self::Gold | Self::Diamond | Self::BlueShield
        )
    }

    /// Tiers allowed to withdraw (enabled tiers plus `Disabled`).
    #[must_use]
    pub fn may_withdraw(self) -> bool {
        self.is_enabled() || self == Self::Disabled
    }

    /// Hold-down between the last balance change and a withdrawal.
    #[must_use]
    pub fn withdraw_hold(self) -> Duration {
        let secs = match self {
            Self::Gold => WITHDRAW_HOLD_GOLD_SECS,
            Self::Diamond => WITHDRAW_HOLD_DIAMOND_SECS,
            Self::BlueShield => WITHDRAW_HOLD_BLUESHIELD_SECS,
            _ => WITHDRAW_HOLD_BASIC_SECS,
        };
        Duration::seconds(secs)
    }
}

impl std::fmt::Display for MerchantTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "REGISTERED"),
            Self::Basic => write!(f, "BASIC"),
            Self::Gold => write!(f, "GOLD"),
            Self::Diamond => write!(f, "DIAMOND"),
            Self::BlueShield => write!(f, "BLUESHIELD"),
            Self::Disabled => write!(f, "DISABLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Validate a free-text field against its cap.
pub fn check_text(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() >= max {
        return Err(OtcError::TextTooLarge {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

/// A registered merchant. Balances are keyed by symbol code; amounts are
/// raw integers in each symbol's declared precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub account: AccountId,
    pub name: String,
    pub detail: String,
    pub email: String,
    pub memo: String,
    pub tier: MerchantTier,
    pub balances: BTreeMap<String, BalanceEntry>,
    /// Last balance or profile change; withdraw hold-downs count from here.
    pub updated_at: DateTime<Utc>,
}

impl Merchant {
    /// # Errors
    /// `TextTooLarge` when a contact field exceeds its cap.
    pub fn new(
        account: AccountId,
        name: impl Into<String>,
        detail: impl Into<String>,
        email: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        let detail = detail.into();
        let email = email.into();
        check_text("merchant_name", &name, MAX_NAME_LEN)?;
        check_text("merchant_detail", &detail, MAX_DETAIL_LEN)?;
        check_text("email", &email, MAX_EMAIL_LEN)?;
        Ok(Self {
            account,
            name,
            detail,
            email,
            memo: String::new(),
            tier: MerchantTier::Registered,
            balances: BTreeMap::new(),
            updated_at: now,
        })
    }

    /// # Errors
    /// `TextTooLarge` when the memo exceeds its cap.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<()> {
        let memo = memo.into();
        check_text("memo", &memo, MAX_MEMO_LEN)?;
        self.memo = memo;
        Ok(())
    }

    /// Balance entry for a symbol (zero if the merchant never held it).
    #[must_use]
    pub fn balance(&self, symbol: &Symbol) -> BalanceEntry {
        self.balances
            .get(&symbol.code)
            .copied()
            .unwrap_or_default()
    }

    /// Whether the merchant holds any balance at all (available or frozen).
    #[must_use]
    pub fn holds_funds(&self) -> bool {
        self.balances.values().any(|entry| !entry.is_zero())
    }
}
