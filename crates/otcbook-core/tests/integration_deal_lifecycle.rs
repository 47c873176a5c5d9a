//! Integration test: full deal lifecycle
//!
//! open order → open deal → handshake → forced close → order retirement
//!
//! Exercises the stake arithmetic (1000 × 7.00 × 2% = 140 frozen),
//! the payment-timeout gate on forced closes, fee extraction, settlement
//! recording, and the no-leakage stake round trip.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use otcbook_core::OtcBook;
use otcbook_types::{
    AccountId, Asset, BookConfig, Command, DealAction, DealStatus, ErrorKind, MerchantTier,
    OrderId, OrderSn, OrderStatus, OtcError, Role, Side, Symbol,
};

fn amax(units: i64) -> Asset {
    Asset::new(units * 10_000, Symbol::new("AMAX", 4).unwrap())
}

fn cny(cents: i64) -> Asset {
    Asset::new(cents, Symbol::new("CNY", 2).unwrap())
}

fn musdt() -> Symbol {
    Symbol::new("MUSDT", 4).unwrap()
}

fn musdt_raw(raw: i64) -> Asset {
    Asset::new(raw, musdt())
}

struct Setup {
    book: OtcBook,
    admin: AccountId,
    maker: AccountId,
    taker: AccountId,
    order_id: OrderId,
    t0: DateTime<Utc>,
}

fn setup() -> Setup {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut book = OtcBook::new(BookConfig::demo());
    let admin = book.config().admin.clone();
    let maker = AccountId::from("merchantm");
    let taker = AccountId::from("takert");
    let t0 = Utc::now();

    book.register_merchant(&admin, maker.clone(), "Merchant M", "", "m@example.com", t0)
        .unwrap();
    book.set_merchant_tier(&admin, &maker, MerchantTier::Gold, None, t0)
        .unwrap();
    // 200.0000 MUSDT covers the 140 stake with room for fees.
    book.deposit(&maker, &musdt_raw(2_000_000), t0).unwrap();

    let order_id = book
        .open_order(
            &maker,
            Side::Sell,
            amax(1_000),
            cny(700),
            amax(100),
            amax(1_000),
            BTreeSet::from(["bank".to_string()]),
            "bulk sell",
            t0,
        )
        .unwrap();

    Setup {
        book,
        admin,
        maker,
        taker,
        order_id,
        t0,
    }
}

#[test]
fn full_deal_lifecycle() {
    // =====================================================================
    // SETUP: merchant posts a 1000-unit sell order at 7.00 CNY
    // =====================================================================
    let Setup {
        mut book,
        admin,
        maker,
        taker,
        order_id,
        t0,
    } = setup();

    // 1000 × 7.00 × 2% = 140.0000 MUSDT frozen.
    let order = book.order(Side::Sell, order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Running);
    assert_eq!(order.stake_frozen.amount, 1_400_000);
    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.available, 600_000);
    assert_eq!(bal.frozen, 1_400_000);

    // =====================================================================
    // OPEN DEAL: taker reserves 200 units
    // =====================================================================
    let deal_id = book
        .open_deal(
            &taker,
            Side::Sell,
            order_id,
            amax(200),
            OrderSn(555_001),
            "bank",
            t0,
        )
        .unwrap();
    let order = book.order(Side::Sell, order_id).unwrap();
    assert_eq!(order.frozen_quantity.amount, 200 * 10_000);
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::Created);

    // =====================================================================
    // HANDSHAKE: accept → send → receive-and-send, in strict order
    // =====================================================================
    let t1 = t0 + Duration::minutes(1);
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t1)
        .unwrap();
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t1)
        .unwrap();
    let t2 = t0 + Duration::minutes(2);
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerRecvAndSent, t2)
        .unwrap();
    let deal = book.deal(deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::MakerRecvAndSent);
    assert_eq!(deal.paid_at, Some(t2));

    // =====================================================================
    // FORCED CLOSE: gated by the payment timeout for maker and admin
    // =====================================================================
    let too_early = t2 + Duration::seconds(10);
    let err = book
        .close_deal(&admin, Role::Admin, deal_id, "force close", too_early)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotYetExpired);

    let after_window = t2 + Duration::seconds(1_801);
    book.close_deal(&admin, Role::Admin, deal_id, "force close", after_window)
        .unwrap();

    // Deal closed; order capacity moved frozen → fulfilled; the deal's
    // proportional stake (200 × 7.00 × 2% = 28) was released and the fee
    // (200 × 7.00 × 0.3% = 4.2) debited.
    let deal = book.deal(deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::Closed);
    let order = book.order(Side::Sell, order_id).unwrap();
    assert!(order.frozen_quantity.is_zero());
    assert_eq!(order.fulfilled_quantity.amount, 200 * 10_000);
    assert_eq!(order.stake_frozen.amount, 1_400_000 - 280_000);

    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.frozen, 1_120_000);
    assert_eq!(bal.available, 600_000 + 280_000 - 42_000);

    // Settlement recorder and fee split were commanded.
    let commands = book.drain_commands();
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::FeeSplit { quantity, .. } if quantity.amount == 42_000
    )));
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::SettleDeal { amount, fee, maker: m, taker: t, .. }
            if amount.amount == 1_400 * 10_000
                && fee.amount == 42_000
                && m == &maker
                && t == &taker
    )));

    // =====================================================================
    // IDEMPOTENCE: closing twice must fail, never double-release
    // =====================================================================
    let err = book
        .close_deal(&admin, Role::Admin, deal_id, "again", after_window)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let bal_after = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal_after.frozen, 1_120_000);

    // =====================================================================
    // RETIRE ORDER: the residual stake comes back exactly once
    // =====================================================================
    book.close_order(&maker, Side::Sell, order_id, after_window)
        .unwrap();
    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.frozen, 0);
    // Everything except the fee is back.
    assert_eq!(bal.available, 2_000_000 - 42_000);
}

#[test]
fn duplicate_order_sn_is_conflict() {
    let Setup {
        mut book,
        taker,
        order_id,
        t0,
        ..
    } = setup();
    book.open_deal(&taker, Side::Sell, order_id, amax(200), OrderSn(9), "bank", t0)
        .unwrap();
    let err = book
        .open_deal(
            &AccountId::from("othertaker"),
            Side::Sell,
            order_id,
            amax(200),
            OrderSn(9),
            "bank",
            t0,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(err, OtcError::DuplicateOrderSn(OrderSn(9))));
}

#[test]
fn taker_may_close_any_non_terminal_state() {
    let Setup {
        mut book,
        maker,
        taker,
        order_id,
        t0,
        ..
    } = setup();
    let deal_id = book
        .open_deal(&taker, Side::Sell, order_id, amax(200), OrderSn(11), "bank", t0)
        .unwrap();
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t0)
        .unwrap();

    // No timeout applies to the taker.
    book.close_deal(&taker, Role::User, deal_id, "done early", t0)
        .unwrap();
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::Closed);
}

#[test]
fn maker_cannot_close_before_taker_pays() {
    let Setup {
        mut book,
        maker,
        taker,
        order_id,
        t0,
        ..
    } = setup();
    let deal_id = book
        .open_deal(&taker, Side::Sell, order_id, amax(200), OrderSn(12), "bank", t0)
        .unwrap();

    // CREATED: maker has no close right at all.
    let err = book
        .close_deal(&maker, Role::Merchant, deal_id, "", t0)
        .unwrap_err();
    assert!(matches!(err, OtcError::CloseNotAllowed { .. }));

    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t0)
        .unwrap();
    let err = book
        .close_deal(&maker, Role::Merchant, deal_id, "", t0)
        .unwrap_err();
    assert!(matches!(err, OtcError::CloseNotAllowed { .. }));

    // From TAKER_SENT (no payment timestamp yet) the maker may close.
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();
    book.close_deal(&maker, Role::Merchant, deal_id, "taker sent, settling", t0)
        .unwrap();
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::Closed);
}

#[test]
fn full_drain_auto_closes_order() {
    let Setup {
        mut book,
        maker,
        taker,
        order_id,
        t0,
        ..
    } = setup();
    // One deal takes the whole order.
    let deal_id = book
        .open_deal(&taker, Side::Sell, order_id, amax(1_000), OrderSn(13), "bank", t0)
        .unwrap();
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t0)
        .unwrap();
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();
    book.close_deal(&taker, Role::User, deal_id, "all done", t0)
        .unwrap();

    // The whole stake released with the single deal: the order drained and
    // closed itself.
    let order = book.order(Side::Sell, order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Closed);
    assert!(order.is_drained());
    assert_eq!(order.closed_at, Some(t0));

    // 1000 × 7.00 × 0.3% = 21.0000 MUSDT fee is the only loss.
    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.frozen, 0);
    assert_eq!(bal.available, 2_000_000 - 210_000);
}

#[test]
fn reset_deal_reopens_stuck_handshake() {
    let Setup {
        mut book,
        admin,
        maker,
        taker,
        order_id,
        t0,
    } = setup();
    let deal_id = book
        .open_deal(&taker, Side::Sell, order_id, amax(200), OrderSn(14), "bank", t0)
        .unwrap();
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t0)
        .unwrap();
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();

    // Only the admin may reset.
    assert!(matches!(
        book.reset_deal(&maker, deal_id, t0),
        Err(OtcError::NotAdmin(_))
    ));

    book.reset_deal(&admin, deal_id, t0).unwrap();
    let deal = book.deal(deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::Created);
    assert!(deal.accepted_at.is_none());
    assert!(deal.paid_at.is_none());

    // Capacity unchanged by the reset of a live deal.
    let order = book.order(Side::Sell, order_id).unwrap();
    assert_eq!(order.frozen_quantity.amount, 200 * 10_000);

    // The handshake can run again.
    book.process_deal(&maker, Role::Merchant, deal_id, DealAction::MakerAccept, t0)
        .unwrap();
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::MakerAccepted);
}
