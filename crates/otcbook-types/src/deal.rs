//! Deal types and the escrow handshake transition table.
//!
//! A deal is one taker's partial or full acceptance of an order. It moves
//! through the payment handshake `CREATED → MAKER_ACCEPTED → TAKER_SENT →
//! MAKER_RECV_AND_SENT` and terminates at `CLOSED` or `CANCELLED`. The
//! handshake itself is pure data: [`TRANSITIONS`] is the complete rule set
//! and [`next_status`] the only way to advance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, DealId, OrderId, OrderSn, OtcError, Result, Side};

/// Handshake status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    Created,
    MakerAccepted,
    TakerSent,
    MakerRecvAndSent,
    Closed,
    Cancelled,
}

impl DealStatus {
    /// Terminal statuses admit no further processing.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::MakerAccepted => write!(f, "MAKER_ACCEPTED"),
            Self::TakerSent => write!(f, "TAKER_SENT"),
            Self::MakerRecvAndSent => write!(f, "MAKER_RECV_AND_SENT"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Arbitration status, orthogonal to the handshake status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArbitStatus {
    Unarbitted,
    Arbiting,
    ClosedNoFine,
    ClosedWithFine,
}

impl std::fmt::Display for ArbitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unarbitted => write!(f, "UNARBITTED"),
            Self::Arbiting => write!(f, "ARBITING"),
            Self::ClosedNoFine => write!(f, "CLOSED_NO_FINE"),
            Self::ClosedWithFine => write!(f, "CLOSED_WITH_FINE"),
        }
    }
}

/// The three handshake actions a counterparty can take via `process_deal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealAction {
    MakerAccept,
    TakerSend,
    MakerRecvAndSent,
}

impl std::fmt::Display for DealAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MakerAccept => write!(f, "MAKER_ACCEPT"),
            Self::TakerSend => write!(f, "TAKER_SEND"),
            Self::MakerRecvAndSent => write!(f, "MAKER_RECV_AND_SENT"),
        }
    }
}

/// Who is calling. `Merchant` is the order maker, `User` the taker;
/// `Admin` and `Arbiter` are privileged roles resolved by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Merchant,
    User,
    Admin,
    Arbiter,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merchant => write!(f, "MERCHANT"),
            Self::User => write!(f, "USER"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Arbiter => write!(f, "ARBITER"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// One row of the handshake rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub action: DealAction,
    pub role: Role,
    pub arbit: ArbitStatus,
    pub current: DealStatus,
    pub next: DealStatus,
}

/// The complete handshake rule set, matched exactly on
/// `(action, role, arbit status, current status)`.
pub const TRANSITIONS: [TransitionRule; 3] = [
    TransitionRule {
        action: DealAction::MakerAccept,
        role: Role::Merchant,
        arbit: ArbitStatus::Unarbitted,
        current: DealStatus::Created,
        next: DealStatus::MakerAccepted,
    },
    TransitionRule {
        action: DealAction::TakerSend,
        role: Role::User,
        arbit: ArbitStatus::Unarbitted,
        current: DealStatus::MakerAccepted,
        next: DealStatus::TakerSent,
    },
    TransitionRule {
        action: DealAction::MakerRecvAndSent,
        role: Role::Merchant,
        arbit: ArbitStatus::Unarbitted,
        current: DealStatus::TakerSent,
        next: DealStatus::MakerRecvAndSent,
    },
];

/// Resolve the next handshake status, or reject the invocation.
///
/// # Errors
/// `InvalidTransition` when no row matches the exact
/// `(action, role, arbit, current)` tuple.
pub fn next_status(
    action: DealAction,
    role: Role,
    arbit: ArbitStatus,
    current: DealStatus,
) -> Result<DealStatus> {
    TRANSITIONS
        .iter()
        .find(|rule| {
            rule.action == action
                && rule.role == role
                && rule.arbit == arbit
                && rule.current == current
        })
        .map(|rule| rule.next)
        .ok_or(OtcError::InvalidTransition {
            action,
            role,
            status: current,
            arbit,
        })
}

// ---------------------------------------------------------------------------
// Deal record
// ---------------------------------------------------------------------------

/// One taker-initiated deal against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub side: Side,
    pub order_id: OrderId,
    pub maker: AccountId,
    pub taker: AccountId,
    pub quantity: Asset,
    /// The parent order's price at open time.
    pub price: Asset,
    /// Fee in the stake asset, computed once at open.
    pub fee: Asset,
    pub pay_method: String,
    pub status: DealStatus,
    pub arbit_status: ArbitStatus,
    /// Assigned on `start_arbit`, cleared never (kept for the audit trail).
    pub arbiter: Option<AccountId>,
    pub order_sn: OrderSn,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub close_msg: String,
}

impl Deal {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The counterparty to notify when `account` acts.
    #[must_use]
    pub fn counterparty_of(&self, role: Role) -> &AccountId {
        match role {
            Role::Merchant => &self.taker,
            _ => &self.maker,
        }
    }
}
