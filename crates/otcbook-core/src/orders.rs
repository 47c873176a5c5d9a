//! Order lifecycle operations: open, pause, resume, close.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use otcbook_types::constants::MAX_MEMO_LEN;
use otcbook_types::math::order_stake;
use otcbook_types::merchant::check_text;
use otcbook_types::{
    AccountId, Asset, Order, OrderId, OrderStatus, OtcError, Result, Side,
};
use tracing::info;

use crate::engine::OtcBook;

impl OtcBook {
    /// Post a new order. Freezes the merchant's stake before the order
    /// becomes visible; a failed freeze leaves nothing behind.
    #[allow(clippy::too_many_arguments)]
    pub fn open_order(
        &mut self,
        owner: &AccountId,
        side: Side,
        quantity: Asset,
        price: Asset,
        min_take: Asset,
        max_take: Asset,
        pay_methods: BTreeSet<String>,
        memo: &str,
        now: DateTime<Utc>,
    ) -> Result<OrderId> {
        self.cfg.require_operational()?;

        // --- parameter validation, no state touched ---
        if !quantity.is_positive() {
            return Err(OtcError::InvalidParameter {
                reason: format!("quantity must be positive: {quantity}"),
            });
        }
        if !price.is_positive() {
            return Err(OtcError::InvalidParameter {
                reason: format!("price must be positive: {price}"),
            });
        }
        if price.symbol != self.cfg.fiat {
            return Err(OtcError::SymbolMismatch {
                expected: self.cfg.fiat.clone(),
                actual: price.symbol,
            });
        }
        let stake_symbol = self.cfg.stake_symbol(&quantity.symbol)?.clone();
        self.cfg.check_coin_allowed(side, &quantity.symbol)?;
        self.cfg.check_pay_methods(&pay_methods)?;
        quantity.same_symbol(&min_take)?;
        quantity.same_symbol(&max_take)?;
        if !min_take.is_positive() || min_take.amount > quantity.amount {
            return Err(OtcError::InvalidParameter {
                reason: format!("min_take {min_take} outside (0, {quantity}]"),
            });
        }
        if !max_take.is_positive() || max_take.amount > quantity.amount {
            return Err(OtcError::InvalidParameter {
                reason: format!("max_take {max_take} outside (0, {quantity}]"),
            });
        }
        check_text("memo", memo, MAX_MEMO_LEN)?;

        let merchant = self.ledger.get(owner)?;
        if !merchant.tier.is_enabled() {
            return Err(OtcError::MerchantNotEnabled {
                account: owner.clone(),
                tier: merchant.tier.to_string(),
            });
        }

        // --- stake freeze is the last fallible step ---
        let stake = order_stake(&quantity, &price, &stake_symbol, self.cfg.stake_pct)?;
        if !stake.is_zero() {
            self.ledger.freeze(owner, &stake, now)?;
        }

        let id = self.book.allocate_id(side);
        let coin = quantity.symbol.clone();
        self.book.insert(Order {
            id,
            side,
            owner: owner.clone(),
            quantity,
            price,
            min_take,
            max_take,
            pay_methods,
            frozen_quantity: Asset::zero(coin.clone()),
            fulfilled_quantity: Asset::zero(coin),
            stake_frozen: stake.clone(),
            status: OrderStatus::Running,
            memo: memo.to_string(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        });
        info!(%side, order = %id, merchant = %owner, %stake, "order opened");
        Ok(id)
    }

    /// Running → Paused. Owner only.
    pub fn pause_order(
        &mut self,
        owner: &AccountId,
        side: Side,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ledger.get(owner)?;
        let order = self.owned_order_mut(owner, side, id)?;
        if order.status != OrderStatus::Running {
            return Err(OtcError::OrderWrongStatus {
                side,
                id,
                expected: OrderStatus::Running,
                actual: order.status,
            });
        }
        order.status = OrderStatus::Paused;
        order.updated_at = now;
        Ok(())
    }

    /// Paused → Running. Owner only.
    pub fn resume_order(
        &mut self,
        owner: &AccountId,
        side: Side,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ledger.get(owner)?;
        let order = self.owned_order_mut(owner, side, id)?;
        if order.status != OrderStatus::Paused {
            return Err(OtcError::OrderWrongStatus {
                side,
                id,
                expected: OrderStatus::Paused,
                actual: order.status,
            });
        }
        order.status = OrderStatus::Running;
        order.updated_at = now;
        Ok(())
    }

    /// Retire an order: owner only, nothing in flight, remaining stake
    /// returned to the merchant's available balance.
    pub fn close_order(
        &mut self,
        owner: &AccountId,
        side: Side,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ledger.get(owner)?;
        let order = self.owned_order(owner, side, id)?;
        if order.status == OrderStatus::Closed {
            return Err(OtcError::OrderAlreadyClosed { side, id });
        }
        if !order.frozen_quantity.is_zero() {
            return Err(OtcError::OrderBusy {
                side,
                id,
                frozen: order.frozen_quantity.clone(),
            });
        }
        let remaining_stake = order.stake_frozen.clone();

        if !remaining_stake.is_zero() {
            self.ledger.unfreeze(owner, &remaining_stake, now)?;
        }
        let order = self.book.get_mut(side, id)?;
        order.stake_frozen.amount = 0;
        order.status = OrderStatus::Closed;
        order.closed_at = Some(now);
        order.updated_at = now;
        info!(%side, order = %id, merchant = %owner, stake_released = %remaining_stake, "order closed");
        Ok(())
    }

    /// Read an order.
    pub fn order(&self, side: Side, id: OrderId) -> Result<&Order> {
        self.book.get(side, id)
    }

    fn owned_order(&self, owner: &AccountId, side: Side, id: OrderId) -> Result<&Order> {
        let order = self.book.get(side, id)?;
        if order.owner != *owner {
            return Err(OtcError::OrderNotOwned {
                side,
                id,
                owner: order.owner.clone(),
                caller: owner.clone(),
            });
        }
        Ok(order)
    }

    fn owned_order_mut(
        &mut self,
        owner: &AccountId,
        side: Side,
        id: OrderId,
    ) -> Result<&mut Order> {
        let order = self.book.get_mut(side, id)?;
        if order.owner != *owner {
            return Err(OtcError::OrderNotOwned {
                side,
                id,
                owner: order.owner.clone(),
                caller: owner.clone(),
            });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;
    use otcbook_types::{BookConfig, Symbol};

    fn amax(units: i64) -> Asset {
        Asset::new(units * 10_000, Symbol::new("AMAX", 4).unwrap())
    }

    fn cny(cents: i64) -> Asset {
        Asset::new(cents, Symbol::new("CNY", 2).unwrap())
    }

    fn musdt() -> Symbol {
        Symbol::new("MUSDT", 4).unwrap()
    }

    #[test]
    fn open_order_freezes_proportional_stake() {
        // 1000 AMAX at 7.00 CNY with a 2% stake → 140.0000 MUSDT frozen.
        let (mut book, maker, now) = testkit::book_with_funded_maker(200 * 10_000);
        let id = book
            .open_order(
                &maker,
                Side::Sell,
                amax(1_000),
                cny(700),
                amax(100),
                amax(1_000),
                testkit::bank(),
                "",
                now,
            )
            .unwrap();

        let order = book.order(Side::Sell, id).unwrap();
        assert_eq!(order.status, OrderStatus::Running);
        assert_eq!(order.stake_frozen.amount, 140 * 10_000);

        let bal = book.merchant(&maker).unwrap().balance(&musdt());
        assert_eq!(bal.available, 60 * 10_000);
        assert_eq!(bal.frozen, 140 * 10_000);
    }

    #[test]
    fn open_order_insufficient_stake_leaves_nothing() {
        let (mut book, maker, now) = testkit::book_with_funded_maker(10 * 10_000);
        let err = book
            .open_order(
                &maker,
                Side::Sell,
                amax(1_000),
                cny(700),
                amax(100),
                amax(1_000),
                testkit::bank(),
                "",
                now,
            )
            .unwrap_err();
        assert!(matches!(err, OtcError::InsufficientAvailable { .. }));
        assert_eq!(book.book.len(Side::Sell), 0);
        let bal = book.merchant(&maker).unwrap().balance(&musdt());
        assert_eq!(bal.frozen, 0);
    }

    #[test]
    fn open_order_validates_inputs() {
        let (mut book, maker, now) = testkit::book_with_funded_maker(1_000 * 10_000);

        // wrong fiat
        let err = book
            .open_order(
                &maker,
                Side::Sell,
                amax(100),
                Asset::new(700, Symbol::new("USD", 2).unwrap()),
                amax(10),
                amax(100),
                testkit::bank(),
                "",
                now,
            )
            .unwrap_err();
        assert!(matches!(err, OtcError::SymbolMismatch { .. }));

        // unknown pay method
        let err = book
            .open_order(
                &maker,
                Side::Sell,
                amax(100),
                cny(700),
                amax(10),
                amax(100),
                BTreeSet::from(["cash".to_string()]),
                "",
                now,
            )
            .unwrap_err();
        assert!(matches!(err, OtcError::PayMethodNotAllowed(_)));

        // min_take above quantity
        let err = book
            .open_order(
                &maker,
                Side::Sell,
                amax(100),
                cny(700),
                amax(200),
                amax(100),
                testkit::bank(),
                "",
                now,
            )
            .unwrap_err();
        assert!(matches!(err, OtcError::InvalidParameter { .. }));
    }

    #[test]
    fn open_order_requires_enabled_merchant() {
        let mut book = OtcBook::new(BookConfig::demo());
        let admin = book.config().admin.clone();
        let maker = AccountId::from("newbie");
        let now = Utc::now();
        book.register_merchant(&admin, maker.clone(), "n", "", "", now)
            .unwrap();
        // Registered but not yet enabled.
        let err = book
            .open_order(
                &maker,
                Side::Sell,
                amax(100),
                cny(700),
                amax(10),
                amax(100),
                testkit::bank(),
                "",
                now,
            )
            .unwrap_err();
        assert!(matches!(err, OtcError::MerchantNotEnabled { .. }));
    }

    #[test]
    fn pause_resume_cycle() {
        let (mut book, maker, now) = testkit::book_with_funded_maker(200 * 10_000);
        let id = testkit::open_sell_order(&mut book, &maker, 1_000, now);

        book.pause_order(&maker, Side::Sell, id, now).unwrap();
        assert_eq!(
            book.order(Side::Sell, id).unwrap().status,
            OrderStatus::Paused
        );
        // Pausing twice fails.
        assert!(matches!(
            book.pause_order(&maker, Side::Sell, id, now),
            Err(OtcError::OrderWrongStatus { .. })
        ));
        book.resume_order(&maker, Side::Sell, id, now).unwrap();
        assert_eq!(
            book.order(Side::Sell, id).unwrap().status,
            OrderStatus::Running
        );
    }

    #[test]
    fn owner_only_access() {
        let (mut book, maker, now) = testkit::book_with_funded_maker(200 * 10_000);
        let id = testkit::open_sell_order(&mut book, &maker, 1_000, now);
        let admin = book.config().admin.clone();
        let stranger = AccountId::from("stranger");
        book.register_merchant(&admin, stranger.clone(), "s", "", "", now)
            .unwrap();
        assert!(matches!(
            book.pause_order(&stranger, Side::Sell, id, now),
            Err(OtcError::OrderNotOwned { .. })
        ));
    }

    #[test]
    fn close_returns_full_stake_round_trip() {
        let (mut book, maker, now) = testkit::book_with_funded_maker(200 * 10_000);
        let id = testkit::open_sell_order(&mut book, &maker, 1_000, now);

        book.close_order(&maker, Side::Sell, id, now).unwrap();
        let order = book.order(Side::Sell, id).unwrap();
        assert_eq!(order.status, OrderStatus::Closed);
        assert!(order.stake_frozen.is_zero());

        // Exactly the opening balance is back: no leakage, no double credit.
        let bal = book.merchant(&maker).unwrap().balance(&musdt());
        assert_eq!(bal.available, 200 * 10_000);
        assert_eq!(bal.frozen, 0);

        // Closing again fails.
        assert!(matches!(
            book.close_order(&maker, Side::Sell, id, now),
            Err(OtcError::OrderAlreadyClosed { .. })
        ));
    }
}
