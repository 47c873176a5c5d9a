//! Shared fixtures for unit tests: a demo-configured engine with funded
//! merchants, standard sell orders, and canned deals.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use otcbook_types::{
    AccountId, Asset, BookConfig, DealAction, DealId, MerchantTier, OrderId, OrderSn, Role, Side,
    Symbol,
};

use crate::engine::OtcBook;

pub(crate) fn bank() -> BTreeSet<String> {
    BTreeSet::from(["bank".to_string()])
}

fn amax(units: i64) -> Asset {
    Asset::new(units * 10_000, Symbol::new("AMAX", 4).unwrap())
}

fn cny(cents: i64) -> Asset {
    Asset::new(cents, Symbol::new("CNY", 2).unwrap())
}

/// Engine with one enabled merchant holding `musdt_raw` MUSDT available.
pub(crate) fn book_with_funded_maker(musdt_raw: i64) -> (OtcBook, AccountId, DateTime<Utc>) {
    let mut book = OtcBook::new(BookConfig::demo());
    let admin = book.config().admin.clone();
    let maker = AccountId::from("maker1");
    let now = Utc::now();
    book.register_merchant(&admin, maker.clone(), "Maker One", "", "maker@example.com", now)
        .unwrap();
    book.set_merchant_tier(&admin, &maker, MerchantTier::Basic, None, now)
        .unwrap();
    if musdt_raw > 0 {
        book.deposit(
            &maker,
            &Asset::new(musdt_raw, Symbol::new("MUSDT", 4).unwrap()),
            now,
        )
        .unwrap();
    }
    (book, maker, now)
}

/// Standard sell order: `units` AMAX at 7.00 CNY, takeable 100..=units.
pub(crate) fn open_sell_order(
    book: &mut OtcBook,
    maker: &AccountId,
    units: i64,
    now: DateTime<Utc>,
) -> OrderId {
    book.open_order(
        maker,
        Side::Sell,
        amax(units),
        cny(700),
        amax(100),
        amax(units),
        bank(),
        "",
        now,
    )
    .unwrap()
}

/// Funded maker with a 1000-unit running sell order and a taker account.
pub(crate) fn book_with_order_and_taker() -> (OtcBook, AccountId, AccountId, OrderId, DateTime<Utc>)
{
    let (mut book, maker, now) = book_with_funded_maker(200 * 10_000);
    let order_id = open_sell_order(&mut book, &maker, 1_000, now);
    let taker = AccountId::from("taker1");
    (book, maker, taker, order_id, now)
}

/// Everything from [`book_with_order_and_taker`] plus an open 200-unit deal.
pub(crate) fn book_with_deal() -> (OtcBook, AccountId, AccountId, OrderId, DealId, DateTime<Utc>) {
    let (mut book, maker, taker, order_id, now) = book_with_order_and_taker();
    let deal_id = book
        .open_deal(
            &taker,
            Side::Sell,
            order_id,
            amax(200),
            OrderSn(7_000_001),
            "bank",
            now,
        )
        .unwrap();
    (book, maker, taker, order_id, deal_id, now)
}

/// Run the handshake up to `TAKER_SENT`.
pub(crate) fn advance_to_taker_sent(
    book: &mut OtcBook,
    maker: &AccountId,
    taker: &AccountId,
    deal_id: DealId,
    now: DateTime<Utc>,
) {
    book.process_deal(maker, Role::Merchant, deal_id, DealAction::MakerAccept, now)
        .unwrap();
    book.process_deal(taker, Role::User, deal_id, DealAction::TakerSend, now)
        .unwrap();
}

/// Register arbiters in the given order.
pub(crate) fn register_arbiters(book: &mut OtcBook, names: &[&str]) {
    let admin = book.config().admin.clone();
    for name in names {
        book.add_arbiter(&admin, AccountId::from(*name), "arbiter@example.com")
            .unwrap();
    }
}
