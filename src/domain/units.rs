//! Unit Conversion
//!
//! Human-readable decimal amounts <-> integer base units.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Decimals of the native currency
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Negative amount: {0}")]
    Negative(Decimal),
    #[error("Amount {amount} has more than {decimals} decimal places")]
    TooPrecise { amount: Decimal, decimals: u8 },
    #[error("Amount overflows 256 bits")]
    Overflow,
}

/// Convert a decimal amount into base units, e.g. `1.5` ETH -> `1.5e18` wei
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, UnitsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative(amount));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(UnitsError::TooPrecise { amount, decimals });
    }

    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    let factor = U256::from(10u64)
        .checked_pow(U256::from(u32::from(decimals) - scale))
        .ok_or(UnitsError::Overflow)?;
    mantissa.checked_mul(factor).ok_or(UnitsError::Overflow)
}

/// Render base units as a decimal string, trimming trailing zeros
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}
