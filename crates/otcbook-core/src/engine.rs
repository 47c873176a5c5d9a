//! The `OtcBook` engine: configuration snapshot, components, and the
//! merchant/ledger/blacklist entry points.
//!
//! Execution is strictly single-threaded with serializable transaction
//! semantics: each entry point runs to completion, and a failed validation
//! aborts the whole call with no state committed. The engine never reads a
//! clock; every operation takes the caller-observed `now`. Caller
//! *authentication* is the host's job; the engine enforces authorization
//! (ownership, roles, admin) only.
//!
//! Order operations live in `orders.rs`, deal operations in `deals.rs`,
//! arbitration in `arbitration.rs`; all are `impl OtcBook` blocks.

use chrono::{DateTime, Utc};
use otcbook_types::constants::{DEFAULT_BLACKLIST_SECS, MAX_BLACKLIST_SECS};
use otcbook_types::{
    AccountId, Asset, BookConfig, Command, Event, Merchant, MerchantTier, OtcError, Result,
};
use tracing::info;

use crate::arbitration::ArbiterPool;
use crate::blacklist::Blacklist;
use crate::book::OrderBook;
use crate::deals::DealTable;
use crate::ledger::Ledger;
use crate::outbox::Outbox;

/// The OTC escrow engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OtcBook {
    pub(crate) cfg: BookConfig,
    pub(crate) ledger: Ledger,
    pub(crate) book: OrderBook,
    pub(crate) deals: DealTable,
    pub(crate) arbiters: ArbiterPool,
    pub(crate) blacklist: Blacklist,
    pub(crate) outbox: Outbox,
}

impl OtcBook {
    #[must_use]
    pub fn new(cfg: BookConfig) -> Self {
        Self {
            cfg,
            ledger: Ledger::new(),
            book: OrderBook::new(),
            deals: DealTable::new(),
            arbiters: ArbiterPool::new(),
            blacklist: Blacklist::new(),
            outbox: Outbox::new(),
        }
    }

    // =================================================================
    // Configuration
    // =================================================================

    #[must_use]
    pub fn config(&self) -> &BookConfig {
        &self.cfg
    }

    /// Replace the configuration snapshot (the provider refreshed).
    pub fn set_config(&mut self, cfg: BookConfig) {
        self.cfg = cfg;
    }

    pub(crate) fn require_admin(&self, caller: &AccountId) -> Result<()> {
        if *caller == self.cfg.admin {
            Ok(())
        } else {
            Err(OtcError::NotAdmin(caller.clone()))
        }
    }

    // =================================================================
    // Outbox access
    // =================================================================

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.outbox.drain_events()
    }

    /// Take all pending collaborator commands.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        self.outbox.drain_commands()
    }

    /// Peek pending notifications without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[Event] {
        self.outbox.events()
    }

    /// Peek pending commands without draining.
    #[must_use]
    pub fn pending_commands(&self) -> &[Command] {
        self.outbox.commands()
    }

    // =================================================================
    // Merchant registry (admin-gated)
    // =================================================================

    /// Register a merchant in `Registered` standing.
    pub fn register_merchant(
        &mut self,
        caller: &AccountId,
        account: AccountId,
        name: &str,
        detail: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_admin(caller)?;
        let merchant = Merchant::new(account.clone(), name, detail, email, now)?;
        self.ledger.register(merchant)?;
        info!(merchant = %account, "merchant registered");
        Ok(())
    }

    /// Move a merchant to a new tier. Rejection carries a reason that is
    /// surfaced to the merchant as an event.
    pub fn set_merchant_tier(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        tier: MerchantTier,
        reject_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_admin(caller)?;
        let merchant = self.ledger.get_mut(account)?;
        merchant.tier = tier;
        merchant.updated_at = now;
        if tier == MerchantTier::Rejected {
            if let Some(reason) = reject_reason {
                self.outbox.push_event(Event::MerchantRejected {
                    account: account.clone(),
                    reason: reason.to_string(),
                    at: now,
                });
            }
        }
        info!(merchant = %account, %tier, "merchant tier changed");
        Ok(())
    }

    /// Self-service re-application after a rejection.
    pub fn reapply_merchant(&mut self, account: &AccountId, now: DateTime<Utc>) -> Result<()> {
        let merchant = self.ledger.get_mut(account)?;
        if merchant.tier != MerchantTier::Rejected {
            return Err(OtcError::MerchantNotEnabled {
                account: account.clone(),
                tier: merchant.tier.to_string(),
            });
        }
        merchant.tier = MerchantTier::Registered;
        merchant.updated_at = now;
        Ok(())
    }

    /// Remove a merchant. Refuses while any balance remains.
    pub fn remove_merchant(&mut self, caller: &AccountId, account: &AccountId) -> Result<()> {
        self.require_admin(caller)?;
        self.ledger.remove(account)
    }

    /// Read a merchant record.
    pub fn merchant(&self, account: &AccountId) -> Result<&Merchant> {
        self.ledger.get(account)
    }

    // =================================================================
    // Deposits & withdrawals
    // =================================================================

    /// Credit a merchant's available balance.
    pub fn deposit(
        &mut self,
        account: &AccountId,
        quantity: &Asset,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.cfg.require_operational()?;
        self.cfg.stake_contract(&quantity.symbol)?;
        let merchant = self.ledger.get(account)?;
        if !merchant.tier.is_enabled() {
            return Err(OtcError::MerchantNotEnabled {
                account: account.clone(),
                tier: merchant.tier.to_string(),
            });
        }
        self.ledger.credit(account, quantity, now)?;
        self.outbox.push_event(Event::StakeChanged {
            account: account.clone(),
            quantity: quantity.clone(),
            memo: "merchant deposit".into(),
        });
        info!(merchant = %account, %quantity, "deposit");
        Ok(())
    }

    /// Debit a merchant's available balance and hand the host a transfer
    /// command. Gated by the tier's withdraw hold-down since the last
    /// balance change.
    pub fn withdraw(
        &mut self,
        account: &AccountId,
        quantity: &Asset,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.cfg.require_operational()?;
        let contract = self.cfg.stake_contract(&quantity.symbol)?.clone();
        let merchant = self.ledger.get(account)?;
        if !merchant.tier.may_withdraw() {
            return Err(OtcError::MerchantNotEnabled {
                account: account.clone(),
                tier: merchant.tier.to_string(),
            });
        }
        let until = merchant.updated_at + merchant.tier.withdraw_hold();
        if now <= until {
            return Err(OtcError::WithdrawHeld {
                account: account.clone(),
                until,
            });
        }
        self.ledger.debit(account, quantity, now)?;
        self.outbox.push_event(Event::StakeChanged {
            account: account.clone(),
            quantity: quantity.negated(),
            memo: "merchant withdraw".into(),
        });
        self.outbox.push_command(Command::Transfer {
            contract,
            to: account.clone(),
            quantity: quantity.clone(),
            memo: "merchant withdraw".into(),
        });
        info!(merchant = %account, %quantity, "withdraw");
        Ok(())
    }

    // =================================================================
    // Blacklist administration
    // =================================================================

    /// Blacklist an account for `duration_secs` (0 removes the entry).
    pub fn set_blacklist(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        duration_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_admin(caller)?;
        if duration_secs > MAX_BLACKLIST_SECS {
            return Err(OtcError::BlacklistTooLong {
                requested: duration_secs,
                max: MAX_BLACKLIST_SECS,
            });
        }
        if duration_secs > 0 {
            self.blacklist
                .set(account, now + chrono::Duration::seconds(duration_secs));
        } else {
            self.blacklist.remove(account);
        }
        Ok(())
    }

    /// Whether an account is currently blocked from opening deals.
    #[must_use]
    pub fn is_blacklisted(&self, account: &AccountId, now: DateTime<Utc>) -> bool {
        self.blacklist.is_blocked(account, now)
    }

    /// The fixed duration a maker-initiated cancel blacklists a taker for.
    pub(crate) fn default_blacklist_until(now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(DEFAULT_BLACKLIST_SECS)
    }
}
