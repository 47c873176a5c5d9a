//! Arbitration: roster management, dispute start/resolve/cancel.
//!
//! The arbiter pool is an explicit ordered roster (registration order) so
//! the modulo assignment `deal_id % len` is deterministic for a given pool
//! composition, never dependent on ambient map iteration order. Removal
//! keeps the relative order of the remaining arbiters.

use chrono::{DateTime, Utc};
use otcbook_types::constants::MAX_EMAIL_LEN;
use otcbook_types::math::order_stake;
use otcbook_types::merchant::check_text;
use otcbook_types::{
    AccountId, Arbiter, ArbitStatus, Asset, Command, DealId, DealStatus, Event, OtcError, Result,
    Role,
};
use tracing::info;

use crate::engine::OtcBook;

/// Deal statuses arbitration may be started from.
const ARBITRABLE: &str = "MAKER_ACCEPTED|TAKER_SENT|MAKER_RECV_AND_SENT";

// ---------------------------------------------------------------------------
// Arbiter pool
// ---------------------------------------------------------------------------

/// Registration-ordered arbiter roster.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArbiterPool {
    roster: Vec<Arbiter>,
}

impl ArbiterPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `ArbiterExists` if the account already sits on the roster.
    pub fn add(&mut self, arbiter: Arbiter) -> Result<()> {
        if self.contains(&arbiter.account) {
            return Err(OtcError::ArbiterExists(arbiter.account));
        }
        self.roster.push(arbiter);
        Ok(())
    }

    /// Remove an arbiter, keeping the remaining registration order.
    ///
    /// # Errors
    /// `ArbiterNotFound` if absent.
    pub fn remove(&mut self, account: &AccountId) -> Result<()> {
        let index = self
            .roster
            .iter()
            .position(|a| a.account == *account)
            .ok_or_else(|| OtcError::ArbiterNotFound(account.clone()))?;
        self.roster.remove(index);
        Ok(())
    }

    /// Deterministic assignment: the arbiter at `deal_id % len`.
    ///
    /// # Errors
    /// `NoArbiters` on an empty roster: a hard precondition failure,
    /// never a silent fallback.
    pub fn assign(&self, deal_id: DealId) -> Result<&AccountId> {
        if self.roster.is_empty() {
            return Err(OtcError::NoArbiters);
        }
        let index = usize::try_from(deal_id.0 % self.roster.len() as u64)
            .map_err(|_| OtcError::NoArbiters)?;
        Ok(&self.roster[index].account)
    }

    /// # Errors
    /// `ArbiterNotFound` if absent.
    pub fn get(&self, account: &AccountId) -> Result<&Arbiter> {
        self.roster
            .iter()
            .find(|a| a.account == *account)
            .ok_or_else(|| OtcError::ArbiterNotFound(account.clone()))
    }

    /// # Errors
    /// `ArbiterNotFound` if absent.
    pub fn get_mut(&mut self, account: &AccountId) -> Result<&mut Arbiter> {
        self.roster
            .iter_mut()
            .find(|a| a.account == *account)
            .ok_or_else(|| OtcError::ArbiterNotFound(account.clone()))
    }

    #[must_use]
    pub fn contains(&self, account: &AccountId) -> bool {
        self.roster.iter().any(|a| a.account == *account)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Arbitration operations
// ---------------------------------------------------------------------------

impl OtcBook {
    /// Register an arbiter (admin only).
    pub fn add_arbiter(
        &mut self,
        caller: &AccountId,
        account: AccountId,
        email: &str,
    ) -> Result<()> {
        self.require_admin(caller)?;
        check_text("email", email, MAX_EMAIL_LEN)?;
        self.arbiters.add(Arbiter::new(account.clone(), email))?;
        info!(arbiter = %account, "arbiter registered");
        Ok(())
    }

    /// Remove an arbiter from the roster (admin only). Deals already
    /// assigned to them keep their assignment.
    pub fn remove_arbiter(&mut self, caller: &AccountId, account: &AccountId) -> Result<()> {
        self.require_admin(caller)?;
        self.arbiters.remove(account)
    }

    /// Operational reassignment of a deal's arbiter (admin only).
    pub fn set_deal_arbiter(
        &mut self,
        caller: &AccountId,
        deal_id: DealId,
        arbiter: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.arbiters.get(arbiter)?;
        let deal = self.deals.get_mut(deal_id)?;
        deal.arbiter = Some(arbiter.clone());
        deal.updated_at = now;
        Ok(())
    }

    /// Read an arbiter record.
    pub fn arbiter(&self, account: &AccountId) -> Result<&Arbiter> {
        self.arbiters.get(account)
    }

    /// Open a dispute. Maker or taker only; the deal must be mid-handshake
    /// and not already under arbitration.
    pub fn start_arbit(
        &mut self,
        account: &AccountId,
        role: Role,
        deal_id: DealId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let deal = self.deals.get(deal_id)?;
        match role {
            Role::Merchant | Role::User => {
                self.check_role_account(deal, role, account, "start_arbit")?;
            }
            _ => {
                return Err(OtcError::RoleNotAllowed {
                    role,
                    action: "start_arbit",
                });
            }
        }
        self.book.get(deal.side, deal.order_id)?;
        if deal.arbit_status != ArbitStatus::Unarbitted {
            return Err(OtcError::ArbitWrongStatus {
                id: deal_id,
                expected: ArbitStatus::Unarbitted,
                actual: deal.arbit_status,
            });
        }
        if !matches!(
            deal.status,
            DealStatus::MakerAccepted | DealStatus::TakerSent | DealStatus::MakerRecvAndSent
        ) {
            return Err(OtcError::DealWrongStatus {
                id: deal_id,
                required: ARBITRABLE,
                actual: deal.status,
            });
        }

        let arbiter = self.arbiters.assign(deal_id)?.clone();
        let deal = self.deals.get_mut(deal_id)?;
        deal.arbit_status = ArbitStatus::Arbiting;
        deal.arbiter = Some(arbiter.clone());
        deal.updated_at = now;
        info!(deal = %deal_id, %arbiter, "arbitration started");
        Ok(())
    }

    /// Resolve a dispute. The assigned arbiter decides:
    ///
    /// - `favor_taker = true`: no fault found worth fining. The deal is
    ///   cancelled, the reserved quantity returns to the order, no fee, no
    ///   stake movement, and the arbiter records a failed case.
    /// - `favor_taker = false`: the deal closes as fulfilled, but the
    ///   maker's proportional stake is forfeited: deducted as a fine and
    ///   transferred out to the taker. The arbiter records a closed case.
    pub fn resolve_arbit(
        &mut self,
        account: &AccountId,
        deal_id: DealId,
        favor_taker: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // --- load & validate ---
        let deal = self.deals.get(deal_id)?;
        match &deal.arbiter {
            Some(assigned) if assigned == account => {}
            _ => {
                return Err(OtcError::NotAssignedArbiter {
                    id: deal_id,
                    caller: account.clone(),
                });
            }
        }
        if deal.arbit_status != ArbitStatus::Arbiting {
            return Err(OtcError::ArbitWrongStatus {
                id: deal_id,
                expected: ArbitStatus::Arbiting,
                actual: deal.arbit_status,
            });
        }
        self.arbiters.get(account)?;

        let side = deal.side;
        let order_id = deal.order_id;
        let maker = deal.maker.clone();
        let taker = deal.taker.clone();
        let quantity = deal.quantity.clone();
        let price = deal.price.clone();

        let order = self.book.get(side, order_id)?;
        if order.frozen_quantity.amount < quantity.amount {
            return Err(OtcError::InvalidParameter {
                reason: format!(
                    "order {order_id} frozen quantity {} below deal quantity {quantity}",
                    order.frozen_quantity
                ),
            });
        }

        if favor_taker {
            // --- apply: cancel without fine ---
            let order = self.book.get_mut(side, order_id)?;
            order.frozen_quantity.amount -= quantity.amount;
            order.updated_at = now;

            let deal = self.deals.get_mut(deal_id)?;
            deal.status = DealStatus::Cancelled;
            deal.arbit_status = ArbitStatus::ClosedNoFine;
            deal.closed_at = Some(now);
            deal.updated_at = now;

            self.arbiters
                .get_mut(account)?
                .record_case(false, quantity.amount);
            info!(deal = %deal_id, arbiter = %account, "arbitration resolved: cancelled, no fine");
        } else {
            let stake_symbol = self.cfg.stake_symbol(&quantity.symbol)?.clone();
            let proportional = order_stake(&quantity, &price, &stake_symbol, self.cfg.stake_pct)?;
            let release = Asset::new(
                proportional.amount.min(order.stake_frozen.amount),
                stake_symbol.clone(),
            );
            let custody = self.cfg.stake_contract(&stake_symbol)?.clone();

            // --- apply: close with the stake forfeited to the taker ---
            self.ledger.forfeit_stake(&maker, &release, now)?;

            let order = self.book.get_mut(side, order_id)?;
            order.stake_frozen.amount -= release.amount;
            order.frozen_quantity.amount -= quantity.amount;
            order.fulfilled_quantity.amount += quantity.amount;
            order.updated_at = now;

            let deal = self.deals.get_mut(deal_id)?;
            deal.status = DealStatus::Closed;
            deal.arbit_status = ArbitStatus::ClosedWithFine;
            deal.closed_at = Some(now);
            deal.updated_at = now;

            if !release.is_zero() {
                self.outbox.push_event(Event::StakeChanged {
                    account: maker.clone(),
                    quantity: release.negated(),
                    memo: format!("arbit fine:{}", deal_id.0),
                });
                self.outbox.push_command(Command::Transfer {
                    contract: custody,
                    to: taker,
                    quantity: release.clone(),
                    memo: format!("arbit fine: {}", deal_id.0),
                });
            }
            self.arbiters
                .get_mut(account)?
                .record_case(true, quantity.amount);
            info!(deal = %deal_id, arbiter = %account, fine = %release, "arbitration resolved: closed with fine");
        }
        Ok(())
    }

    /// Withdraw a dispute. Only the maker, only while arbitration is
    /// pending and the deal still sits at `MAKER_ACCEPTED`; the handshake
    /// status is untouched.
    pub fn cancel_arbit(
        &mut self,
        account: &AccountId,
        role: Role,
        deal_id: DealId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let deal = self.deals.get(deal_id)?;
        if role != Role::Merchant {
            return Err(OtcError::RoleNotAllowed {
                role,
                action: "cancel_arbit",
            });
        }
        self.check_role_account(deal, role, account, "cancel_arbit")?;
        if deal.arbit_status != ArbitStatus::Arbiting {
            return Err(OtcError::ArbitWrongStatus {
                id: deal_id,
                expected: ArbitStatus::Arbiting,
                actual: deal.arbit_status,
            });
        }
        if deal.status != DealStatus::MakerAccepted {
            return Err(OtcError::DealWrongStatus {
                id: deal_id,
                required: "MAKER_ACCEPTED",
                actual: deal.status,
            });
        }

        let deal = self.deals.get_mut(deal_id)?;
        deal.arbit_status = ArbitStatus::Unarbitted;
        deal.updated_at = now;
        info!(deal = %deal_id, "arbitration cancelled by maker");
        Ok(())
    }
}
