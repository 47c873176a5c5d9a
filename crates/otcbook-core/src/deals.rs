//! Deal escrow: table, open/process handshake, forced close, cancel, and
//! the admin reset escape hatch.
//!
//! Every operation loads and validates everything it needs before the
//! first mutation, so a failure commits nothing. The handshake itself is
//! the pure transition table in `otcbook-types`; this module wires it to
//! authorization, timeouts, capacity, and the ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use otcbook_types::constants::MAX_CLOSE_MSG_LEN;
use otcbook_types::math::{deal_amount, deal_fee, order_stake};
use otcbook_types::merchant::check_text;
use otcbook_types::{
    AccountId, ArbitStatus, Asset, Command, Deal, DealAction, DealActionKind, DealChange, DealId,
    DealStatus, Event, OrderId, OrderSn, OrderStatus, OtcError, Result, Role, Side, next_status,
};
use tracing::info;

use crate::engine::OtcBook;

// ---------------------------------------------------------------------------
// Deal table
// ---------------------------------------------------------------------------

/// Keyed deal store with a global id sequence and a unique secondary index
/// on the caller-supplied `order_sn` idempotency token. Tokens are
/// remembered forever, so a retried open can never create a duplicate deal.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct DealTable {
    deals: BTreeMap<u64, Deal>,
    /// `order_sn` → deal id, never evicted.
    by_sn: BTreeMap<u64, u64>,
    next_id: u64,
}

impl DealTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the sequence. Ids start at 1 and are never reused.
    pub fn allocate_id(&mut self) -> DealId {
        self.next_id += 1;
        DealId(self.next_id)
    }

    /// # Errors
    /// `DuplicateOrderSn` if the token was ever used before.
    pub fn check_sn_unused(&self, sn: OrderSn) -> Result<()> {
        if self.by_sn.contains_key(&sn.0) {
            return Err(OtcError::DuplicateOrderSn(sn));
        }
        Ok(())
    }

    /// Insert a freshly built deal and index its token.
    pub fn insert(&mut self, deal: Deal) {
        self.by_sn.insert(deal.order_sn.0, deal.id.0);
        self.deals.insert(deal.id.0, deal);
    }

    /// # Errors
    /// `DealNotFound` if absent.
    pub fn get(&self, id: DealId) -> Result<&Deal> {
        self.deals.get(&id.0).ok_or(OtcError::DealNotFound(id))
    }

    /// # Errors
    /// `DealNotFound` if absent.
    pub fn get_mut(&mut self, id: DealId) -> Result<&mut Deal> {
        self.deals.get_mut(&id.0).ok_or(OtcError::DealNotFound(id))
    }

    /// Look a deal up by its idempotency token.
    #[must_use]
    pub fn by_order_sn(&self, sn: OrderSn) -> Option<&Deal> {
        self.by_sn.get(&sn.0).and_then(|id| self.deals.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Deal operations
// ---------------------------------------------------------------------------

impl OtcBook {
    /// Open a deal against a running order.
    #[allow(clippy::too_many_arguments)]
    pub fn open_deal(
        &mut self,
        taker: &AccountId,
        side: Side,
        order_id: OrderId,
        quantity: Asset,
        order_sn: OrderSn,
        pay_method: &str,
        now: DateTime<Utc>,
    ) -> Result<DealId> {
        self.cfg.require_operational()?;
        if !quantity.is_positive() {
            return Err(OtcError::InvalidParameter {
                reason: format!("deal quantity must be positive: {quantity}"),
            });
        }

        // --- load & validate ---
        let order = self.book.get(side, order_id)?;
        if order.owner == *taker {
            return Err(OtcError::SelfDeal(taker.clone()));
        }
        if order.status != OrderStatus::Running {
            return Err(OtcError::OrderWrongStatus {
                side,
                id: order_id,
                expected: OrderStatus::Running,
                actual: order.status,
            });
        }
        order.check_take(&quantity)?;
        if !order.pay_methods.contains(pay_method) {
            return Err(OtcError::PayMethodNotAllowed(pay_method.to_string()));
        }
        let maker = order.owner.clone();
        let price = order.price.clone();

        self.blacklist.ensure_clear(taker, now)?;
        self.deals.check_sn_unused(order_sn)?;

        let stake_symbol = self.cfg.stake_symbol(&quantity.symbol)?.clone();
        let fee = deal_fee(&quantity, &price, &stake_symbol, self.cfg.fee_pct)?;

        // --- apply ---
        let id = self.deals.allocate_id();
        let deal = Deal {
            id,
            side,
            order_id,
            maker: maker.clone(),
            taker: taker.clone(),
            quantity: quantity.clone(),
            price,
            fee,
            pay_method: pay_method.to_string(),
            status: DealStatus::Created,
            arbit_status: ArbitStatus::Unarbitted,
            arbiter: None,
            order_sn,
            created_at: now,
            accepted_at: None,
            paid_at: None,
            closed_at: None,
            updated_at: now,
            close_msg: String::new(),
        };
        let change = DealChange::from(&deal);
        self.deals.insert(deal);

        let order = self.book.get_mut(side, order_id)?;
        order.frozen_quantity.amount += quantity.amount;
        order.updated_at = now;

        self.outbox.push_event(Event::DealChanged {
            recipient: maker,
            action: DealActionKind::Create,
            change,
        });
        info!(deal = %id, %side, order = %order_id, taker = %taker, "deal opened");
        Ok(id)
    }

    /// Advance the handshake by one table row.
    pub fn process_deal(
        &mut self,
        account: &AccountId,
        role: Role,
        deal_id: DealId,
        action: DealAction,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // --- load & validate ---
        let deal = self.deals.get(deal_id)?;
        self.check_role_account(deal, role, account, "process_deal")?;
        if deal.is_terminal() {
            return Err(OtcError::DealTerminal {
                id: deal_id,
                status: deal.status,
            });
        }
        // The parent order must still exist (it cannot be deleted, but a
        // missing row means corrupted state and is surfaced loudly).
        self.book.get(deal.side, deal.order_id)?;

        let next = next_status(action, role, deal.arbit_status, deal.status)?;

        // --- apply ---
        let deal = self.deals.get_mut(deal_id)?;
        deal.status = next;
        deal.updated_at = now;
        match action {
            DealAction::MakerAccept => deal.accepted_at = Some(now),
            DealAction::MakerRecvAndSent => deal.paid_at = Some(now),
            DealAction::TakerSend => {}
        }

        if matches!(role, Role::Merchant | Role::User) {
            let recipient = deal.counterparty_of(role).clone();
            let change = DealChange::from(&*deal);
            let kind = match action {
                DealAction::MakerAccept => DealActionKind::MakerAccept,
                DealAction::TakerSend => DealActionKind::TakerSend,
                DealAction::MakerRecvAndSent => DealActionKind::MakerRecvAndSent,
            };
            self.outbox.push_event(Event::DealChanged {
                recipient,
                action: kind,
                change,
            });
        }
        info!(deal = %deal_id, %action, %role, status = %next, "deal processed");
        Ok(())
    }

    /// Forced close: settles the deal as fulfilled.
    ///
    /// Permitted for the taker in any non-terminal state, the admin
    /// likewise, the assigned arbiter while arbitrating, and the maker only
    /// from `TAKER_SENT`/`MAKER_RECV_AND_SENT`. Once a payment timestamp
    /// exists, maker and admin must additionally wait out the payment
    /// timeout (the taker's fair window to contest).
    pub fn close_deal(
        &mut self,
        account: &AccountId,
        role: Role,
        deal_id: DealId,
        close_msg: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        check_text("close_msg", close_msg, MAX_CLOSE_MSG_LEN)?;

        // --- load & validate ---
        let deal = self.deals.get(deal_id)?;
        if deal.is_terminal() {
            return Err(OtcError::DealTerminal {
                id: deal_id,
                status: deal.status,
            });
        }
        match role {
            Role::User => self.check_role_account(deal, role, account, "close_deal")?,
            Role::Admin => self.require_admin(account)?,
            Role::Arbiter => {
                self.check_role_account(deal, role, account, "close_deal")?;
                if deal.arbit_status != ArbitStatus::Arbiting {
                    return Err(OtcError::ArbitWrongStatus {
                        id: deal_id,
                        expected: ArbitStatus::Arbiting,
                        actual: deal.arbit_status,
                    });
                }
            }
            Role::Merchant => {
                self.check_role_account(deal, role, account, "close_deal")?;
                if !matches!(
                    deal.status,
                    DealStatus::TakerSent | DealStatus::MakerRecvAndSent
                ) {
                    return Err(OtcError::CloseNotAllowed {
                        id: deal_id,
                        role,
                        status: deal.status,
                    });
                }
            }
        }
        if matches!(role, Role::Merchant | Role::Admin) {
            if let Some(paid_at) = deal.paid_at {
                let expires_at = paid_at + self.cfg.payed_timeout();
                if now <= expires_at {
                    return Err(OtcError::NotYetExpired {
                        id: deal_id,
                        expires_at,
                    });
                }
            }
        }

        let side = deal.side;
        let order_id = deal.order_id;
        let maker = deal.maker.clone();
        let taker = deal.taker.clone();
        let quantity = deal.quantity.clone();
        let price = deal.price.clone();
        let fee = deal.fee.clone();
        let opened_at = deal.created_at;

        let order = self.book.get(side, order_id)?;
        if order.status == OrderStatus::Closed {
            return Err(OtcError::OrderAlreadyClosed { side, id: order_id });
        }
        if order.frozen_quantity.amount < quantity.amount {
            return Err(OtcError::InvalidParameter {
                reason: format!(
                    "order {order_id} frozen quantity {} below deal quantity {quantity}",
                    order.frozen_quantity
                ),
            });
        }
        let stake_symbol = self.cfg.stake_symbol(&quantity.symbol)?.clone();
        let proportional = order_stake(&quantity, &price, &stake_symbol, self.cfg.stake_pct)?;
        // Per-deal stakes truncate, so the sum over deals can undershoot
        // the order's frozen stake; release never exceeds what is left.
        let release = Asset::new(
            proportional.amount.min(order.stake_frozen.amount),
            stake_symbol.clone(),
        );

        // --- apply; the ledger settlement is the last fallible step ---
        self.ledger.settle_close(&maker, &release, &fee, now)?;

        let order = self.book.get_mut(side, order_id)?;
        order.stake_frozen.amount -= release.amount;
        order.frozen_quantity.amount -= quantity.amount;
        order.fulfilled_quantity.amount += quantity.amount;
        order.updated_at = now;
        if order.is_drained() {
            order.status = OrderStatus::Closed;
            order.closed_at = Some(now);
        }

        let deal = self.deals.get_mut(deal_id)?;
        deal.status = DealStatus::Closed;
        deal.closed_at = Some(now);
        deal.updated_at = now;
        deal.close_msg = close_msg.to_string();

        if !fee.is_zero() {
            self.outbox.push_event(Event::StakeChanged {
                account: maker.clone(),
                quantity: fee.negated(),
                memo: format!("fee:{}", deal_id.0),
            });
            self.outbox.push_command(Command::FeeSplit {
                plan_id: self.cfg.fee_split_plan_id,
                quantity: fee.clone(),
            });
        }

        let amount = deal_amount(&quantity, &stake_symbol)?;
        if stake_symbol == self.cfg.settle_symbol {
            if let Some(recorder) = self.cfg.settlement.clone() {
                self.outbox.push_command(Command::SettleDeal {
                    recorder,
                    deal_id,
                    maker: maker.clone(),
                    taker,
                    amount,
                    fee,
                    discount: 0,
                    opened_at,
                    closed_at: now,
                });
            }
        }
        info!(deal = %deal_id, %role, stake_released = %release, "deal closed");
        Ok(())
    }

    /// Cancel a deal from `CREATED` or `MAKER_ACCEPTED`: restores the
    /// order's capacity, charges no fee, and leaves the stake backing the
    /// order. From `MAKER_ACCEPTED`, maker and taker must wait out the
    /// acceptance timeout; an admin never waits. A maker may optionally
    /// blacklist the taker for the default duration.
    pub fn cancel_deal(
        &mut self,
        account: &AccountId,
        role: Role,
        deal_id: DealId,
        blacklist_taker: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // --- load & validate ---
        let deal = self.deals.get(deal_id)?;
        if !matches!(deal.status, DealStatus::Created | DealStatus::MakerAccepted) {
            return Err(OtcError::CancelNotAllowed {
                id: deal_id,
                status: deal.status,
            });
        }
        let mut blacklist_applied = false;
        match role {
            Role::User => {
                self.check_role_account(deal, role, account, "cancel_deal")?;
                if deal.status == DealStatus::MakerAccepted {
                    self.check_accept_expired(deal, now)?;
                }
            }
            Role::Merchant => {
                self.check_role_account(deal, role, account, "cancel_deal")?;
                if deal.status == DealStatus::MakerAccepted {
                    self.check_accept_expired(deal, now)?;
                    blacklist_applied = blacklist_taker;
                }
            }
            Role::Admin => self.require_admin(account)?,
            Role::Arbiter => {
                return Err(OtcError::RoleNotAllowed {
                    role,
                    action: "cancel_deal",
                });
            }
        }

        let side = deal.side;
        let order_id = deal.order_id;
        let taker = deal.taker.clone();
        let quantity = deal.quantity.clone();

        let order = self.book.get(side, order_id)?;
        if order.status == OrderStatus::Closed {
            return Err(OtcError::OrderAlreadyClosed { side, id: order_id });
        }
        if order.frozen_quantity.amount < quantity.amount {
            return Err(OtcError::InvalidParameter {
                reason: format!(
                    "order {order_id} frozen quantity {} below deal quantity {quantity}",
                    order.frozen_quantity
                ),
            });
        }

        // --- apply ---
        let order = self.book.get_mut(side, order_id)?;
        order.frozen_quantity.amount -= quantity.amount;
        order.updated_at = now;

        let deal = self.deals.get_mut(deal_id)?;
        deal.status = DealStatus::Cancelled;
        deal.arbit_status = ArbitStatus::Unarbitted;
        deal.closed_at = Some(now);
        deal.updated_at = now;
        deal.close_msg = "cancel deal".to_string();

        if blacklist_applied {
            self.blacklist.set(&taker, Self::default_blacklist_until(now));
        }
        info!(deal = %deal_id, %role, blacklisted = blacklist_applied, "deal cancelled");
        Ok(())
    }

    /// Admin escape hatch: push a stuck deal back to `CREATED`.
    ///
    /// Resetting a cancelled deal re-reserves the order's capacity, so the
    /// capacity invariant holds throughout.
    pub fn reset_deal(
        &mut self,
        caller: &AccountId,
        deal_id: DealId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_admin(caller)?;

        let deal = self.deals.get(deal_id)?;
        match deal.status {
            DealStatus::Closed => {
                return Err(OtcError::DealWrongStatus {
                    id: deal_id,
                    required: "not CLOSED",
                    actual: deal.status,
                });
            }
            DealStatus::Created => {
                return Err(OtcError::DealWrongStatus {
                    id: deal_id,
                    required: "past CREATED",
                    actual: deal.status,
                });
            }
            _ => {}
        }
        let was_cancelled = deal.status == DealStatus::Cancelled;
        let side = deal.side;
        let order_id = deal.order_id;
        let quantity = deal.quantity.clone();

        if was_cancelled {
            let order = self.book.get(side, order_id)?;
            if order.status == OrderStatus::Closed {
                return Err(OtcError::OrderAlreadyClosed { side, id: order_id });
            }
            order.check_take(&quantity)?;
            let order = self.book.get_mut(side, order_id)?;
            order.frozen_quantity.amount += quantity.amount;
            order.updated_at = now;
        }

        let deal = self.deals.get_mut(deal_id)?;
        deal.status = DealStatus::Created;
        deal.accepted_at = None;
        deal.paid_at = None;
        deal.closed_at = None;
        deal.updated_at = now;
        info!(deal = %deal_id, "deal reset to CREATED");
        Ok(())
    }

    /// Read a deal.
    pub fn deal(&self, id: DealId) -> Result<&Deal> {
        self.deals.get(id)
    }

    // =================================================================
    // Shared checks
    // =================================================================

    /// Match the caller account against what the role requires on this
    /// deal. `Admin` is checked against config by the callers that allow it.
    pub(crate) fn check_role_account(
        &self,
        deal: &Deal,
        role: Role,
        account: &AccountId,
        action: &'static str,
    ) -> Result<()> {
        let expected = match role {
            Role::Merchant => &deal.maker,
            Role::User => &deal.taker,
            Role::Arbiter => {
                return match &deal.arbiter {
                    Some(assigned) if assigned == account => Ok(()),
                    _ => Err(OtcError::NotAssignedArbiter {
                        id: deal.id,
                        caller: account.clone(),
                    }),
                };
            }
            Role::Admin => {
                return Err(OtcError::RoleNotAllowed { role, action });
            }
        };
        if expected != account {
            return Err(OtcError::AccountMismatch {
                role,
                expected: expected.clone(),
                actual: account.clone(),
            });
        }
        Ok(())
    }

    fn check_accept_expired(&self, deal: &Deal, now: DateTime<Utc>) -> Result<()> {
        let accepted_at = deal.accepted_at.unwrap_or(deal.created_at);
        let expires_at = accepted_at + self.cfg.accepted_timeout();
        if now <= expires_at {
            return Err(OtcError::NotYetExpired {
                id: deal.id,
                expires_at,
            });
        }
        Ok(())
    }
}
