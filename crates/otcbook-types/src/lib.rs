//! # otcbook-types
//!
//! Shared types, errors, and configuration for the **OtcBook** trading
//! escrow core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`OrderId`], [`DealId`], [`OrderSn`]
//! - **Asset model**: [`Symbol`], [`Asset`], fixed-point [`math`]
//! - **Merchant model**: [`Merchant`], [`MerchantTier`], [`BalanceEntry`]
//! - **Order model**: [`Order`], [`Side`], [`OrderStatus`]
//! - **Deal model**: [`Deal`], [`DealStatus`], [`ArbitStatus`],
//!   [`DealAction`], [`Role`], and the handshake [`TRANSITIONS`] table
//! - **Arbitration**: [`Arbiter`]
//! - **Configuration**: [`BookConfig`], [`ServiceStatus`]
//! - **Outbound data**: [`Event`], [`Command`], [`DealChange`]
//! - **Errors**: [`OtcError`] with `OTC_ERR_` prefix codes and the
//!   [`ErrorKind`] taxonomy
//! - **Constants**: system-wide limits and defaults

pub mod arbiter;
pub mod asset;
pub mod balance;
pub mod config;
pub mod constants;
pub mod deal;
pub mod error;
pub mod event;
pub mod ids;
pub mod math;
pub mod merchant;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use otcbook_types::{Deal, DealStatus, Order, Role, ...};

pub use arbiter::*;
pub use asset::*;
pub use balance::*;
pub use config::*;
pub use deal::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use merchant::*;
pub use order::*;

// Constants are accessed via `otcbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
