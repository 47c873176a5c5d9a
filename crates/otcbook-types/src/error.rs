//! Error types for the OtcBook escrow core.
//!
//! All errors use the `OTC_ERR_` prefix convention for easy grepping in
//! logs. Error codes are grouped by subsystem:
//! - 1xx: Order book errors
//! - 2xx: Deal escrow errors
//! - 3xx: Ledger / merchant balance errors
//! - 4xx: Arbitration errors
//! - 5xx: Blacklist errors
//! - 6xx: Parameter / config / math errors
//! - 7xx: Service state / authorization errors
//!
//! Every failure aborts the whole requested action; nothing is committed
//! partially. [`OtcError::kind`] maps each variant onto the coarse failure
//! taxonomy callers branch on.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    AccountId, ArbitStatus, Asset, DealAction, DealId, DealStatus, OrderId, OrderSn, OrderStatus,
    Role, Side, Symbol,
};

/// Coarse failure classification. Each [`OtcError`] variant maps onto
/// exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    InvalidParameter,
    InsufficientFunds,
    NotYetExpired,
    Conflict,
}

/// Central error enum for all OtcBook operations.
#[derive(Debug, Error)]
pub enum OtcError {
    // =================================================================
    // Order book errors (1xx)
    // =================================================================
    /// No order with this id on the given side.
    #[error("OTC_ERR_100: {side} order not found: {id}")]
    OrderNotFound { side: Side, id: OrderId },

    /// The caller does not own the order.
    #[error("OTC_ERR_101: {side} order {id} is owned by {owner}, not {caller}")]
    OrderNotOwned {
        side: Side,
        id: OrderId,
        owner: AccountId,
        caller: AccountId,
    },

    /// The order is not in the status the operation requires.
    #[error("OTC_ERR_102: {side} order {id} is {actual}, expected {expected}")]
    OrderWrongStatus {
        side: Side,
        id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The order has already been closed.
    #[error("OTC_ERR_103: {side} order {id} already closed")]
    OrderAlreadyClosed { side: Side, id: OrderId },

    /// The order still has deal-reserved quantity in flight.
    #[error("OTC_ERR_104: {side} order {id} still has {frozen} reserved by open deals")]
    OrderBusy {
        side: Side,
        id: OrderId,
        frozen: Asset,
    },

    /// The requested deal quantity exceeds what the order has left.
    #[error("OTC_ERR_105: {side} order {id} capacity insufficient: requested {requested}, remaining {remaining}")]
    InsufficientCapacity {
        side: Side,
        id: OrderId,
        requested: Asset,
        remaining: Asset,
    },

    /// The requested deal quantity is outside the order's take range.
    #[error("OTC_ERR_106: take {requested} outside [{min}, {max}]")]
    TakeOutOfRange {
        requested: Asset,
        min: Asset,
        max: Asset,
    },

    /// A taker may not open a deal against their own order.
    #[error("OTC_ERR_107: taker {0} is the order's maker")]
    SelfDeal(AccountId),

    // =================================================================
    // Deal escrow errors (2xx)
    // =================================================================
    /// No deal with this id.
    #[error("OTC_ERR_200: deal not found: {0}")]
    DealNotFound(DealId),

    /// The deal has already reached a terminal status.
    #[error("OTC_ERR_201: deal {id} already terminal: {status}")]
    DealTerminal { id: DealId, status: DealStatus },

    /// No row of the transition table matches this invocation.
    #[error("OTC_ERR_202: cannot apply {action} as {role} while {status}/{arbit}")]
    InvalidTransition {
        action: DealAction,
        role: Role,
        status: DealStatus,
        arbit: ArbitStatus,
    },

    /// Forced close is not permitted for this caller here.
    #[error("OTC_ERR_203: {role} may not close deal {id} while {status}")]
    CloseNotAllowed {
        id: DealId,
        role: Role,
        status: DealStatus,
    },

    /// Cancel is only permitted from CREATED or MAKER_ACCEPTED.
    #[error("OTC_ERR_204: deal {id} cannot be cancelled while {status}")]
    CancelNotAllowed { id: DealId, status: DealStatus },

    /// The idempotency token was already used by an earlier deal.
    #[error("OTC_ERR_205: order_sn already used: {0}")]
    DuplicateOrderSn(OrderSn),

    /// A timeout-gated action was attempted before its deadline.
    #[error("OTC_ERR_206: deal {id} not expired until {expires_at}")]
    NotYetExpired {
        id: DealId,
        expires_at: DateTime<Utc>,
    },

    /// The deal is not in a status the operation accepts.
    #[error("OTC_ERR_207: deal {id} is {actual}; operation requires {required}")]
    DealWrongStatus {
        id: DealId,
        required: &'static str,
        actual: DealStatus,
    },

    // =================================================================
    // Ledger / merchant errors (3xx)
    // =================================================================
    /// No merchant registered under this account.
    #[error("OTC_ERR_300: merchant not found: {0}")]
    MerchantNotFound(AccountId),

    /// A merchant already exists under this account.
    #[error("OTC_ERR_301: merchant already registered: {0}")]
    MerchantExists(AccountId),

    /// The merchant's tier does not permit this operation.
    #[error("OTC_ERR_302: merchant {account} not enabled (tier {tier})")]
    MerchantNotEnabled { account: AccountId, tier: String },

    /// Refusing to remove a merchant that still holds funds.
    #[error("OTC_ERR_303: merchant {0} still holds balances")]
    MerchantHasBalance(AccountId),

    /// Not enough available balance.
    #[error("OTC_ERR_304: {account} available balance insufficient: need {needed}, have {available}")]
    InsufficientAvailable {
        account: AccountId,
        needed: Asset,
        available: i64,
    },

    /// Not enough frozen balance to unfreeze.
    #[error("OTC_ERR_305: {account} frozen balance insufficient: need {needed}, have {frozen}")]
    InsufficientFrozen {
        account: AccountId,
        needed: Asset,
        frozen: i64,
    },

    /// Withdraw attempted inside the tier hold-down window.
    #[error("OTC_ERR_306: {account} may not withdraw until {until}")]
    WithdrawHeld {
        account: AccountId,
        until: DateTime<Utc>,
    },

    // =================================================================
    // Arbitration errors (4xx)
    // =================================================================
    /// No arbiter registered under this account.
    #[error("OTC_ERR_400: arbiter not found: {0}")]
    ArbiterNotFound(AccountId),

    /// An arbiter is already registered under this account.
    #[error("OTC_ERR_401: arbiter already registered: {0}")]
    ArbiterExists(AccountId),

    /// Arbitration cannot start with an empty roster.
    #[error("OTC_ERR_402: no arbiters registered")]
    NoArbiters,

    /// The caller is not the arbiter assigned to this deal.
    #[error("OTC_ERR_403: {caller} is not the arbiter assigned to deal {id}")]
    NotAssignedArbiter { id: DealId, caller: AccountId },

    /// The deal is not under arbitration.
    #[error("OTC_ERR_404: deal {id} arbitration status is {actual}, expected {expected}")]
    ArbitWrongStatus {
        id: DealId,
        expected: ArbitStatus,
        actual: ArbitStatus,
    },

    // =================================================================
    // Blacklist errors (5xx)
    // =================================================================
    /// The taker is blocked from opening deals.
    #[error("OTC_ERR_500: taker {account} is blacklisted until {until}")]
    TakerBlacklisted {
        account: AccountId,
        until: DateTime<Utc>,
    },

    /// The requested blacklist duration exceeds the allowed maximum.
    #[error("OTC_ERR_501: blacklist duration {requested}s exceeds maximum {max}s")]
    BlacklistTooLong { requested: i64, max: i64 },

    // =================================================================
    // Parameter / config / math errors (6xx)
    // =================================================================
    /// Generic malformed input.
    #[error("OTC_ERR_600: invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Two assets that must share a symbol do not.
    #[error("OTC_ERR_601: symbol mismatch: expected {expected}, got {actual}")]
    SymbolMismatch { expected: Symbol, actual: Symbol },

    /// Declared precision outside 0..=18.
    #[error("OTC_ERR_602: precision {0} outside [0,18]")]
    PrecisionOutOfRange(u8),

    /// Checked fixed-point arithmetic overflowed.
    #[error("OTC_ERR_603: arithmetic overflow: {context}")]
    Overflow { context: &'static str },

    /// The coin is not allowed on this order side.
    #[error("OTC_ERR_604: coin {symbol} not allowed for {side} orders")]
    CoinNotAllowed { side: Side, symbol: Symbol },

    /// The payment method is not in the configured allow-list.
    #[error("OTC_ERR_605: payment method not allowed: {0}")]
    PayMethodNotAllowed(String),

    /// No stake asset is configured for this coin.
    #[error("OTC_ERR_606: no stake asset configured for coin {0}")]
    StakeAssetUnset(Symbol),

    /// A free-text field exceeds its cap.
    #[error("OTC_ERR_607: {field} too large: {len} > {max}")]
    TextTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // =================================================================
    // Service state / authorization errors (7xx)
    // =================================================================
    /// The service is in maintenance; mutating entry points are refused.
    #[error("OTC_ERR_700: service is in maintenance")]
    ServiceMaintenance,

    /// The caller is not the configured admin.
    #[error("OTC_ERR_701: not admin: {0}")]
    NotAdmin(AccountId),

    /// The caller does not match the account the role requires.
    #[error("OTC_ERR_702: {role} account mismatched: expected {expected}, got {actual}")]
    AccountMismatch {
        role: Role,
        expected: AccountId,
        actual: AccountId,
    },

    /// The role cannot invoke this operation at all.
    #[error("OTC_ERR_703: role {role} not supported for {action}")]
    RoleNotAllowed { role: Role, action: &'static str },
}

impl OtcError {
    /// Map this error onto the coarse taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderNotFound { .. }
            | Self::DealNotFound(_)
            | Self::MerchantNotFound(_)
            | Self::ArbiterNotFound(_) => ErrorKind::NotFound,

            Self::OrderNotOwned { .. }
            | Self::MerchantNotEnabled { .. }
            | Self::NotAssignedArbiter { .. }
            | Self::TakerBlacklisted { .. }
            | Self::NotAdmin(_)
            | Self::AccountMismatch { .. }
            | Self::RoleNotAllowed { .. } => ErrorKind::Unauthorized,

            Self::OrderWrongStatus { .. }
            | Self::OrderAlreadyClosed { .. }
            | Self::OrderBusy { .. }
            | Self::DealTerminal { .. }
            | Self::InvalidTransition { .. }
            | Self::CloseNotAllowed { .. }
            | Self::CancelNotAllowed { .. }
            | Self::DealWrongStatus { .. }
            | Self::MerchantHasBalance(_)
            | Self::NoArbiters
            | Self::ArbitWrongStatus { .. }
            | Self::ServiceMaintenance => ErrorKind::InvalidState,

            Self::InsufficientCapacity { .. }
            | Self::TakeOutOfRange { .. }
            | Self::SelfDeal(_)
            | Self::BlacklistTooLong { .. }
            | Self::InvalidParameter { .. }
            | Self::SymbolMismatch { .. }
            | Self::PrecisionOutOfRange(_)
            | Self::Overflow { .. }
            | Self::CoinNotAllowed { .. }
            | Self::PayMethodNotAllowed(_)
            | Self::StakeAssetUnset(_)
            | Self::TextTooLarge { .. } => ErrorKind::InvalidParameter,

            Self::InsufficientAvailable { .. } | Self::InsufficientFrozen { .. } => {
                ErrorKind::InsufficientFunds
            }

            Self::NotYetExpired { .. } | Self::WithdrawHeld { .. } => ErrorKind::NotYetExpired,

            Self::DuplicateOrderSn(_) | Self::MerchantExists(_) | Self::ArbiterExists(_) => {
                ErrorKind::Conflict
            }
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OtcError>;
