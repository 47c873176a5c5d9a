//! Asset amounts with per-symbol decimal precision.
//!
//! An [`Asset`] is a raw `i64` amount interpreted against its symbol's
//! declared precision: `Asset { amount: 1_400_000, MUSDT(4) }` renders as
//! `140.0000 MUSDT`. Arithmetic is checked and symbol-safe; negative
//! amounts are legal only in event payloads (signed balance deltas), never
//! in stored state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PRECISION;
use crate::math::pow10;
use crate::{OtcError, Result};

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// An asset symbol: ticker code plus declared decimal precision.
///
/// Precision is part of identity: `USDT(4)` and `USDT(6)` are distinct
/// symbols and never interchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Symbol {
    pub code: String,
    pub precision: u8,
}

impl Symbol {
    /// # Errors
    /// Returns `InvalidParameter` for an empty or oversized code and
    /// `PrecisionOutOfRange` for precision above 18.
    pub fn new(code: impl Into<String>, precision: u8) -> Result<Self> {
        let code = code.into();
        if code.is_empty() || code.len() > 12 {
            return Err(OtcError::InvalidParameter {
                reason: format!("symbol code length {} not in 1..=12", code.len()),
            });
        }
        if precision > MAX_PRECISION {
            return Err(OtcError::PrecisionOutOfRange(precision));
        }
        Ok(Self { code, precision })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A raw amount bound to a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    #[must_use]
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    #[must_use]
    pub fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Require that `other` carries the same symbol.
    pub fn same_symbol(&self, other: &Asset) -> Result<()> {
        if self.symbol == other.symbol {
            Ok(())
        } else {
            Err(OtcError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: other.symbol.clone(),
            })
        }
    }

    /// # Errors
    /// `SymbolMismatch` on a cross-symbol add, `Overflow` past `i64`.
    pub fn checked_add(&self, other: &Asset) -> Result<Asset> {
        self.same_symbol(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(OtcError::Overflow {
                context: "asset add",
            })?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    /// # Errors
    /// `SymbolMismatch` on a cross-symbol subtract, `Overflow` past `i64`.
    pub fn checked_sub(&self, other: &Asset) -> Result<Asset> {
        self.same_symbol(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(OtcError::Overflow {
                context: "asset sub",
            })?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    /// The negated amount, for signed event deltas.
    #[must_use]
    pub fn negated(&self) -> Asset {
        Asset::new(-self.amount, self.symbol.clone())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = pow10(self.symbol.precision).unwrap_or(1);
        let magnitude = self.amount.unsigned_abs();
        let sign = if self.amount < 0 { "-" } else { "" };
        let whole = magnitude / unit.unsigned_abs();
        if self.symbol.precision == 0 {
            write!(f, "{sign}{whole} {}", self.symbol.code)
        } else {
            let frac = magnitude % unit.unsigned_abs();
            write!(
                f,
                "{sign}{whole}.{frac:0width$} {}",
                self.symbol.code,
                width = self.symbol.precision as usize,
            )
        }
    }
}
