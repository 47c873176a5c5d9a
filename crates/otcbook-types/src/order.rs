//! Order types for the OtcBook order book.
//!
//! Buy and sell orders are structurally identical but live in independent
//! tables with independent id sequences, so an [`crate::OrderId`] is only
//! meaningful paired with a [`Side`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, OrderId, OtcError, Result};

/// Which book the order lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Running,
    Paused,
    Closed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A merchant's posted offer to buy or sell `quantity` of a coin at `price`
/// fiat per unit, takeable in chunks of `[min_take, max_take]`.
///
/// Capacity invariant: `frozen_quantity + fulfilled_quantity ≤ quantity`
/// at every point. `stake_frozen` is the collateral still reserved behind
/// the order, in the coin's configured stake asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub owner: AccountId,
    pub quantity: Asset,
    pub price: Asset,
    pub min_take: Asset,
    pub max_take: Asset,
    pub pay_methods: BTreeSet<String>,
    /// Quantity reserved by open deals.
    pub frozen_quantity: Asset,
    /// Quantity consumed by closed deals.
    pub fulfilled_quantity: Asset,
    /// Collateral still frozen behind this order.
    pub stake_frozen: Asset,
    pub status: OrderStatus,
    pub memo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Raw amount still takeable: `total − frozen − fulfilled`.
    #[must_use]
    pub fn remaining_amount(&self) -> i64 {
        self.quantity.amount - self.frozen_quantity.amount - self.fulfilled_quantity.amount
    }

    /// Whether both the reserved quantity and the reserved stake are gone.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.frozen_quantity.is_zero() && self.stake_frozen.is_zero()
    }

    /// Require a deal quantity to fit this order: same symbol, inside the
    /// take range, within remaining capacity.
    pub fn check_take(&self, requested: &Asset) -> Result<()> {
        self.quantity.same_symbol(requested)?;
        if requested.amount < self.min_take.amount || requested.amount > self.max_take.amount {
            return Err(OtcError::TakeOutOfRange {
                requested: requested.clone(),
                min: self.min_take.clone(),
                max: self.max_take.clone(),
            });
        }
        if requested.amount > self.remaining_amount() {
            return Err(OtcError::InsufficientCapacity {
                side: self.side,
                id: self.id,
                requested: requested.clone(),
                remaining: Asset::new(self.remaining_amount(), self.quantity.symbol.clone()),
            });
        }
        Ok(())
    }
}
