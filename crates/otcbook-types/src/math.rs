//! Fixed-point integer math for value, stake, and fee computation.
//!
//! Every conversion is an overflow-checked integer multiply-then-divide
//! against each asset's declared decimal precision. Intermediates widen to
//! `i128`; division truncates toward zero. Floating point is never used:
//! rounding order is part of the settled-amount contract.

use crate::constants::{MAX_PRECISION, PERCENT_BOOST};
use crate::{Asset, OtcError, Result, Symbol};

/// `10^precision` as `i64`.
///
/// # Errors
/// Returns `PrecisionOutOfRange` for precision above [`MAX_PRECISION`].
pub fn pow10(precision: u8) -> Result<i64> {
    if precision > MAX_PRECISION {
        return Err(OtcError::PrecisionOutOfRange(precision));
    }
    Ok(10_i64.pow(u32::from(precision)))
}

/// `value * numer / denom` with an `i128` intermediate, truncating toward
/// zero.
///
/// # Errors
/// Returns `Overflow` if the quotient does not fit in `i64` or `denom`
/// is zero.
pub fn mul_div(value: i64, numer: i64, denom: i64) -> Result<i64> {
    if denom == 0 {
        return Err(OtcError::Overflow {
            context: "division by zero",
        });
    }
    let wide = i128::from(value) * i128::from(numer) / i128::from(denom);
    i64::try_from(wide).map_err(|_| OtcError::Overflow {
        context: "mul_div quotient exceeds i64",
    })
}

/// Rescale a quantity into another symbol's precision (no price applied).
///
/// This is the deal amount reported to the settlement recorder.
pub fn deal_amount(quantity: &Asset, stake_symbol: &Symbol) -> Result<Asset> {
    let amount = mul_div(
        quantity.amount,
        pow10(stake_symbol.precision)?,
        pow10(quantity.symbol.precision)?,
    )?;
    Ok(Asset::new(amount, stake_symbol.clone()))
}

/// The fiat value of `quantity` at `price`, expressed in the stake asset's
/// precision.
///
/// Two truncating passes: the price multiply normalizes away the fiat
/// precision first, then the result is rescaled from the quantity's
/// precision into the stake asset's.
pub fn order_value(quantity: &Asset, price: &Asset, stake_symbol: &Symbol) -> Result<Asset> {
    let in_qty_precision = mul_div(
        quantity.amount,
        price.amount,
        pow10(price.symbol.precision)?,
    )?;
    let amount = mul_div(
        in_qty_precision,
        pow10(stake_symbol.precision)?,
        pow10(quantity.symbol.precision)?,
    )?;
    Ok(Asset::new(amount, stake_symbol.clone()))
}

/// Collateral required to back `quantity` at `price`:
/// `order_value × stake_pct / PERCENT_BOOST`.
pub fn order_stake(
    quantity: &Asset,
    price: &Asset,
    stake_symbol: &Symbol,
    stake_pct: u32,
) -> Result<Asset> {
    let value = order_value(quantity, price, stake_symbol)?;
    let amount = mul_div(value.amount, i64::from(stake_pct), PERCENT_BOOST)?;
    Ok(Asset::new(amount, stake_symbol.clone()))
}

/// Fee charged to the maker when a deal closes. Zero when `fee_pct` is zero.
///
/// Two-step on purpose: the percentage multiply truncates before the
/// precision rescale does. Collapsing the two passes into one fused
/// multiply-divide changes settled amounts whenever the precisions differ.
pub fn deal_fee(
    quantity: &Asset,
    price: &Asset,
    stake_symbol: &Symbol,
    fee_pct: u32,
) -> Result<Asset> {
    if fee_pct == 0 {
        return Ok(Asset::zero(stake_symbol.clone()));
    }
    let value = order_value(quantity, price, stake_symbol)?;
    let pct_applied = mul_div(value.amount, i64::from(fee_pct), PERCENT_BOOST)?;
    let amount = mul_div(
        pct_applied,
        pow10(stake_symbol.precision)?,
        pow10(quantity.symbol.precision)?,
    )?;
    Ok(Asset::new(amount, stake_symbol.clone()))
}
