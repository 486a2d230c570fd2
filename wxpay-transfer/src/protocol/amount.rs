//! Major-to-minor currency unit conversion.

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::error::{Result, ValidationError};

const MINOR_PER_MAJOR: i64 = 100;

/// Converts a decimal amount in major units (yuan) to integer minor units (fen).
///
/// Fractions of a minor unit are truncated, never rounded, so the payee never receives
/// more than the caller asked for.
///
/// # Errors
///
/// - [`ValidationError::AmountNotPositive`] when the truncated amount is zero or negative
/// - [`ValidationError::AmountOverflow`] when the amount does not fit in minor units
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use wxpay_transfer::protocol::to_minor_units;
///
/// assert_eq!(to_minor_units(Decimal::new(1234, 2)).unwrap(), 1234);
/// assert!(to_minor_units(Decimal::new(5, 3)).is_err());
/// ```
pub fn to_minor_units(amount: Decimal) -> Result<u64> {
    let minor = truncate_to_minor_units(amount)
        .ok_or_else(|| ValidationError::AmountOverflow(amount.to_string()))?;

    if minor <= 0 {
        return Err(ValidationError::AmountNotPositive(amount.to_string()).into());
    }

    Ok(minor.unsigned_abs())
}

/// Truncating conversion without the positivity check.
///
/// Returns `None` when the amount does not fit in an `i64` of minor units.
#[must_use]
pub fn truncate_to_minor_units(amount: Decimal) -> Option<i64> {
    amount.checked_mul(Decimal::from(MINOR_PER_MAJOR))?.trunc().to_i64()
}
