//! Outbound events and commands, produced as pure data.
//!
//! The engine never performs delivery. Successful state transitions append
//! [`Event`]s (notifications for counterparties) and [`Command`]s (work for
//! the asset-transfer, fee-split, and settlement-recorder collaborators) to
//! an outbox the host drains. A failed operation appends nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, ArbitStatus, Asset, Deal, DealId, DealStatus, OrderId, Side};

/// What happened to a deal, for notification payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealActionKind {
    Create,
    MakerAccept,
    TakerSend,
    MakerRecvAndSent,
    Close,
    Cancel,
    Reset,
}

impl std::fmt::Display for DealActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::MakerAccept => write!(f, "MAKER_ACCEPT"),
            Self::TakerSend => write!(f, "TAKER_SEND"),
            Self::MakerRecvAndSent => write!(f, "MAKER_RECV_AND_SENT"),
            Self::Close => write!(f, "CLOSE"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::Reset => write!(f, "RESET"),
        }
    }
}

/// Snapshot of a deal's externally interesting fields, embedded in
/// [`Event::DealChanged`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealChange {
    pub deal_id: DealId,
    pub order_id: OrderId,
    pub side: Side,
    pub merchant: AccountId,
    pub taker: AccountId,
    pub status: DealStatus,
    pub arbit_status: ArbitStatus,
    pub quantity: Asset,
}

impl From<&Deal> for DealChange {
    fn from(deal: &Deal) -> Self {
        Self {
            deal_id: deal.id,
            order_id: deal.order_id,
            side: deal.side,
            merchant: deal.maker.clone(),
            taker: deal.taker.clone(),
            status: deal.status,
            arbit_status: deal.arbit_status,
            quantity: deal.quantity.clone(),
        }
    }
}

/// A notification for the change-notification sink. Delivery and ordering
/// guarantees belong to the host messaging layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A deal changed; `recipient` is the counterparty to inform.
    DealChanged {
        recipient: AccountId,
        action: DealActionKind,
        change: DealChange,
    },
    /// A merchant's balance moved. `quantity` is signed: negative amounts
    /// are debits.
    StakeChanged {
        account: AccountId,
        quantity: Asset,
        memo: String,
    },
    /// A merchant application was rejected.
    MerchantRejected {
        account: AccountId,
        reason: String,
        at: DateTime<Utc>,
    },
}

/// Work for external collaborators, executed by the host after the
/// transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move fungible value via the custody contract for the asset.
    Transfer {
        contract: AccountId,
        to: AccountId,
        quantity: Asset,
        memo: String,
    },
    /// Forward a collected fee to the fee-split collaborator.
    FeeSplit { plan_id: u64, quantity: Asset },
    /// Report a settled deal to the settlement recorder.
    SettleDeal {
        recorder: AccountId,
        deal_id: DealId,
        maker: AccountId,
        taker: AccountId,
        amount: Asset,
        fee: Asset,
        discount: i64,
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderSn, Symbol};

    #[test]
    fn deal_change_from_deal() {
        let sym = Symbol::new("AMAX", 4).unwrap();
        let deal = Deal {
            id: DealId(9),
            side: Side::Sell,
            order_id: OrderId(3),
            maker: AccountId::from("maker"),
            taker: AccountId::from("taker"),
            quantity: Asset::new(100, sym.clone()),
            price: Asset::new(700, Symbol::new("CNY", 2).unwrap()),
            fee: Asset::zero(Symbol::new("MUSDT", 4).unwrap()),
            pay_method: "bank".into(),
            status: DealStatus::Created,
            arbit_status: ArbitStatus::Unarbitted,
            arbiter: None,
            order_sn: OrderSn(77),
            created_at: Utc::now(),
            accepted_at: None,
            paid_at: None,
            closed_at: None,
            updated_at: Utc::now(),
            close_msg: String::new(),
        };
        let change = DealChange::from(&deal);
        assert_eq!(change.deal_id, DealId(9));
        assert_eq!(change.order_id, OrderId(3));
        assert_eq!(change.merchant.as_str(), "maker");
        assert_eq!(change.status, DealStatus::Created);
    }

    #[test]
    fn action_kind_display() {
        assert_eq!(DealActionKind::Create.to_string(), "CREATE");
        assert_eq!(
            DealActionKind::MakerRecvAndSent.to_string(),
            "MAKER_RECV_AND_SENT"
        );
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = Event::StakeChanged {
            account: AccountId::from("m"),
            quantity: Asset::new(-500, Symbol::new("MUSDT", 4).unwrap()),
            memo: "fee:1".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
