//! Merchant registry and balance bookkeeping.
//!
//! The [`Ledger`] tracks per-(merchant, symbol) balances with two
//! components:
//! - **Available**: usable for new stakes or withdrawal
//! - **Frozen**: locked as collateral behind running orders
//!
//! Four primitives (`credit`, `debit`, `freeze`, `unfreeze`) underpin every
//! order and deal operation. Composite settlements (`settle_close`,
//! `forfeit_stake`) validate every balance condition before touching
//! anything, so a composite either fully applies or leaves the ledger
//! untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use otcbook_types::{AccountId, Asset, BalanceEntry, Merchant, OtcError, Result, Symbol};

/// Merchant registry plus the per-asset balance store.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ledger {
    /// Keyed by account name.
    merchants: BTreeMap<String, Merchant>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Registry
    // =================================================================

    /// # Errors
    /// `MerchantExists` if the account is already registered.
    pub fn register(&mut self, merchant: Merchant) -> Result<()> {
        let key = merchant.account.as_str().to_string();
        if self.merchants.contains_key(&key) {
            return Err(OtcError::MerchantExists(merchant.account));
        }
        self.merchants.insert(key, merchant);
        Ok(())
    }

    /// # Errors
    /// `MerchantNotFound` if absent.
    pub fn get(&self, account: &AccountId) -> Result<&Merchant> {
        self.merchants
            .get(account.as_str())
            .ok_or_else(|| OtcError::MerchantNotFound(account.clone()))
    }

    /// # Errors
    /// `MerchantNotFound` if absent.
    pub fn get_mut(&mut self, account: &AccountId) -> Result<&mut Merchant> {
        self.merchants
            .get_mut(account.as_str())
            .ok_or_else(|| OtcError::MerchantNotFound(account.clone()))
    }

    /// Remove a merchant record.
    ///
    /// # Errors
    /// `MerchantHasBalance` while any balance (available or frozen) is
    /// nonzero; `MerchantNotFound` if absent.
    pub fn remove(&mut self, account: &AccountId) -> Result<()> {
        let merchant = self.get(account)?;
        if merchant.holds_funds() {
            return Err(OtcError::MerchantHasBalance(account.clone()));
        }
        self.merchants.remove(account.as_str());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }

    // =================================================================
    // Primitives
    // =================================================================

    /// Deposit / refund: increase available.
    pub fn credit(&mut self, account: &AccountId, quantity: &Asset, now: DateTime<Utc>) -> Result<()> {
        require_positive(quantity)?;
        let merchant = self.get_mut(account)?;
        let entry = entry_mut(merchant, &quantity.symbol);
        entry.available = checked_add(entry.available, quantity.amount)?;
        merchant.updated_at = now;
        Ok(())
    }

    /// Withdrawal / fee / fine: decrease available.
    ///
    /// # Errors
    /// `InsufficientAvailable` if the available balance is too low.
    pub fn debit(&mut self, account: &AccountId, quantity: &Asset, now: DateTime<Utc>) -> Result<()> {
        require_positive(quantity)?;
        let merchant = self.get_mut(account)?;
        let entry = entry_mut(merchant, &quantity.symbol);
        if entry.available < quantity.amount {
            let available = entry.available;
            return Err(OtcError::InsufficientAvailable {
                account: account.clone(),
                needed: quantity.clone(),
                available,
            });
        }
        entry.available -= quantity.amount;
        merchant.updated_at = now;
        Ok(())
    }

    /// Move available → frozen.
    ///
    /// # Errors
    /// `InsufficientAvailable` if the available balance is too low.
    pub fn freeze(&mut self, account: &AccountId, quantity: &Asset, now: DateTime<Utc>) -> Result<()> {
        require_positive(quantity)?;
        let merchant = self.get_mut(account)?;
        let entry = entry_mut(merchant, &quantity.symbol);
        if entry.available < quantity.amount {
            let available = entry.available;
            return Err(OtcError::InsufficientAvailable {
                account: account.clone(),
                needed: quantity.clone(),
                available,
            });
        }
        entry.available -= quantity.amount;
        entry.frozen = checked_add(entry.frozen, quantity.amount)?;
        merchant.updated_at = now;
        Ok(())
    }

    /// Move frozen → available.
    ///
    /// # Errors
    /// `InsufficientFrozen` if the frozen balance is too low.
    pub fn unfreeze(&mut self, account: &AccountId, quantity: &Asset, now: DateTime<Utc>) -> Result<()> {
        require_positive(quantity)?;
        let merchant = self.get_mut(account)?;
        let entry = entry_mut(merchant, &quantity.symbol);
        if entry.frozen < quantity.amount {
            let frozen = entry.frozen;
            return Err(OtcError::InsufficientFrozen {
                account: account.clone(),
                needed: quantity.clone(),
                frozen,
            });
        }
        entry.frozen -= quantity.amount;
        entry.available = checked_add(entry.available, quantity.amount)?;
        merchant.updated_at = now;
        Ok(())
    }

    // =================================================================
    // Composite settlements (validate everything, then apply)
    // =================================================================

    /// Deal close settlement: unfreeze the released stake, then debit the
    /// fee. Either both happen or neither does.
    pub fn settle_close(
        &mut self,
        account: &AccountId,
        release: &Asset,
        fee: &Asset,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let merchant = self.get(account)?;
        if !release.is_zero() {
            let entry = merchant.balance(&release.symbol);
            if entry.frozen < release.amount {
                return Err(OtcError::InsufficientFrozen {
                    account: account.clone(),
                    needed: release.clone(),
                    frozen: entry.frozen,
                });
            }
        }
        if !fee.is_zero() {
            let entry = merchant.balance(&fee.symbol);
            // The unfreeze lands before the fee debit, so it counts toward
            // the available balance the fee draws from.
            let incoming = if fee.symbol == release.symbol {
                release.amount
            } else {
                0
            };
            let projected = checked_add(entry.available, incoming)?;
            if projected < fee.amount {
                return Err(OtcError::InsufficientAvailable {
                    account: account.clone(),
                    needed: fee.clone(),
                    available: projected,
                });
            }
        }

        let merchant = self.get_mut(account)?;
        if !release.is_zero() {
            let entry = entry_mut(merchant, &release.symbol);
            entry.frozen -= release.amount;
            entry.available += release.amount;
        }
        if !fee.is_zero() {
            let entry = entry_mut(merchant, &fee.symbol);
            entry.available -= fee.amount;
        }
        merchant.updated_at = now;
        Ok(())
    }

    /// Arbitration fine: the released stake is unfrozen and immediately
    /// consumed by the fine debit, so only the frozen side moves.
    pub fn forfeit_stake(
        &mut self,
        account: &AccountId,
        stake: &Asset,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if stake.is_zero() {
            return Ok(());
        }
        let merchant = self.get_mut(account)?;
        let entry = entry_mut(merchant, &stake.symbol);
        if entry.frozen < stake.amount {
            let frozen = entry.frozen;
            return Err(OtcError::InsufficientFrozen {
                account: account.clone(),
                needed: stake.clone(),
                frozen,
            });
        }
        entry.frozen -= stake.amount;
        merchant.updated_at = now;
        Ok(())
    }
}

fn entry_mut<'a>(merchant: &'a mut Merchant, symbol: &Symbol) -> &'a mut BalanceEntry {
    merchant.balances.entry(symbol.code.clone()).or_default()
}

fn require_positive(quantity: &Asset) -> Result<()> {
    if quantity.amount <= 0 {
        return Err(OtcError::InvalidParameter {
            reason: format!("amount must be positive: {quantity}"),
        });
    }
    Ok(())
}

fn checked_add(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or(OtcError::Overflow {
        context: "balance add",
    })
}
