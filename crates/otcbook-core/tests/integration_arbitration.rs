//! Integration test: arbitration end to end
//!
//! dispute start → deterministic assignment → resolve (both branches),
//! including the punitive stake transfer and the arbiter's counters.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use otcbook_core::OtcBook;
use otcbook_types::{
    AccountId, ArbitStatus, Asset, BookConfig, Command, DealAction, DealId, DealStatus,
    MerchantTier, OrderId, OrderSn, OtcError, Role, Side, Symbol,
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

fn setup_with_arbiters(
    arbiters: &[&str],
) -> (OtcBook, AccountId, AccountId, OrderId, DateTime<Utc>) {
    let mut book = OtcBook::new(BookConfig::demo());
    let admin = book.config().admin.clone();
    let maker = AccountId::from("merchantm");
    let taker = AccountId::from("takert");
    let t0 = Utc::now();

    book.register_merchant(&admin, maker.clone(), "Merchant M", "", "m@example.com", t0)
        .unwrap();
    book.set_merchant_tier(&admin, &maker, MerchantTier::Basic, None, t0)
        .unwrap();
    book.deposit(&maker, &Asset::new(2_000_000, musdt()), t0)
        .unwrap();
    for name in arbiters {
        book.add_arbiter(&admin, AccountId::from(*name), "a@example.com")
            .unwrap();
    }
    let order_id = book
        .open_order(
            &maker,
            Side::Sell,
            amax(1_000),
            cny(700),
            amax(100),
            amax(1_000),
            BTreeSet::from(["bank".to_string()]),
            "",
            t0,
        )
        .unwrap();
    (book, maker, taker, order_id, t0)
}

fn open_accepted_deal(
    book: &mut OtcBook,
    maker: &AccountId,
    taker: &AccountId,
    order_id: OrderId,
    sn: u64,
    now: DateTime<Utc>,
) -> DealId {
    let deal_id = book
        .open_deal(taker, Side::Sell, order_id, amax(200), OrderSn(sn), "bank", now)
        .unwrap();
    book.process_deal(maker, Role::Merchant, deal_id, DealAction::MakerAccept, now)
        .unwrap();
    deal_id
}

#[test]
fn assignment_is_deal_id_mod_roster_len() {
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&["j0", "j1", "j2"]);

    // Deal ids are 1, 2, 3 → arbiters j1, j2, j0.
    let expected = ["j1", "j2", "j0"];
    for (i, exp) in expected.iter().enumerate() {
        let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 100 + i as u64, t0);
        book.start_arbit(&taker, Role::User, deal_id, t0).unwrap();
        let deal = book.deal(deal_id).unwrap();
        assert_eq!(deal.arbiter.as_ref().unwrap().as_str(), *exp);
        assert_eq!(deal.arbit_status, ArbitStatus::Arbiting);
        // Clear the dispute before the next round.
        let judge = deal.arbiter.clone().unwrap();
        book.resolve_arbit(&judge, deal_id, true, t0).unwrap();
    }
}

#[test]
fn no_arbiters_is_a_hard_failure() {
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&[]);
    let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 1, t0);
    assert!(matches!(
        book.start_arbit(&taker, Role::User, deal_id, t0),
        Err(OtcError::NoArbiters)
    ));
}

#[test]
fn resolve_with_fine_pays_the_taker_from_maker_stake() {
    // =====================================================================
    // SETUP: deal at TAKER_SENT under arbitration
    // =====================================================================
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&["judge"]);
    let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 1, t0);
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();
    book.start_arbit(&taker, Role::User, deal_id, t0).unwrap();

    // =====================================================================
    // RESOLVE: against the maker, stake forfeited to the taker
    // =====================================================================
    let judge = AccountId::from("judge");
    book.resolve_arbit(&judge, deal_id, false, t0 + Duration::minutes(5))
        .unwrap();

    let deal = book.deal(deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::Closed);
    assert_eq!(deal.arbit_status, ArbitStatus::ClosedWithFine);

    // 200 × 7.00 × 2% = 28.0000 MUSDT: gone from the maker (frozen side),
    // not returned to available, and transferred out to the taker.
    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.frozen, 1_400_000 - 280_000);
    assert_eq!(bal.available, 600_000);

    let commands = book.drain_commands();
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::Transfer { to, quantity, .. }
            if *to == taker && quantity.amount == 280_000
    )));
    // No fee and no settlement record on an arbitrated close.
    assert!(!commands.iter().any(|c| matches!(c, Command::FeeSplit { .. })));
    assert!(!commands.iter().any(|c| matches!(c, Command::SettleDeal { .. })));

    // Order bookkeeping matches a normal close.
    let order = book.order(Side::Sell, order_id).unwrap();
    assert!(order.frozen_quantity.is_zero());
    assert_eq!(order.fulfilled_quantity.amount, 200 * 10_000);

    let arbiter = book.arbiter(&judge).unwrap();
    assert_eq!(arbiter.closed_case_num, 1);
    assert_eq!(arbiter.failed_case_num, 0);
    assert_eq!(arbiter.total_amount, 200 * 10_000);
}

#[test]
fn resolve_for_taker_cancels_and_counts_failed_case() {
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&["judge"]);
    let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 1, t0);
    book.start_arbit(&maker, Role::Merchant, deal_id, t0).unwrap();

    let judge = AccountId::from("judge");
    book.resolve_arbit(&judge, deal_id, true, t0).unwrap();

    let deal = book.deal(deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::Cancelled);
    assert_eq!(deal.arbit_status, ArbitStatus::ClosedNoFine);

    // Nothing moved on the ledger; capacity restored; nothing fulfilled.
    let bal = book.merchant(&maker).unwrap().balance(&musdt());
    assert_eq!(bal.frozen, 1_400_000);
    assert_eq!(bal.available, 600_000);
    let order = book.order(Side::Sell, order_id).unwrap();
    assert!(order.frozen_quantity.is_zero());
    assert!(order.fulfilled_quantity.is_zero());

    let arbiter = book.arbiter(&judge).unwrap();
    assert_eq!(arbiter.failed_case_num, 1);
}

#[test]
fn maker_cancels_arbitration_then_handshake_continues() {
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&["judge"]);
    let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 1, t0);
    book.start_arbit(&taker, Role::User, deal_id, t0).unwrap();

    // While arbitrating, the handshake is blocked.
    assert!(matches!(
        book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0),
        Err(OtcError::InvalidTransition { .. })
    ));

    // Only from MAKER_ACCEPTED, and only the maker.
    book.cancel_arbit(&maker, Role::Merchant, deal_id, t0).unwrap();
    assert_eq!(
        book.deal(deal_id).unwrap().arbit_status,
        ArbitStatus::Unarbitted
    );

    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::TakerSent);
}

#[test]
fn assigned_arbiter_can_force_close_while_arbitrating() {
    let (mut book, maker, taker, order_id, t0) = setup_with_arbiters(&["judge"]);
    let deal_id = open_accepted_deal(&mut book, &maker, &taker, order_id, 1, t0);
    book.process_deal(&taker, Role::User, deal_id, DealAction::TakerSend, t0)
        .unwrap();

    let judge = AccountId::from("judge");
    // Not yet arbitrating: the arbiter has no close rights.
    assert!(matches!(
        book.close_deal(&judge, Role::Arbiter, deal_id, "", t0),
        Err(OtcError::NotAssignedArbiter { .. })
    ));

    book.start_arbit(&taker, Role::User, deal_id, t0).unwrap();
    book.close_deal(&judge, Role::Arbiter, deal_id, "resolved offline", t0)
        .unwrap();
    assert_eq!(book.deal(deal_id).unwrap().status, DealStatus::Closed);
}
