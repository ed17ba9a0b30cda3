//! Fixed-point amount conversion
//!
//! Human-facing amounts are decimals; the ledger stores integers with
//! [`DECIMALS`] implied fractional digits. Conversion into base units
//! truncates toward zero: value below `10^-18` is dropped, never rounded up.

use crate::types::Amount;
use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Implied decimal places of a base-unit amount
pub const DECIMALS: u32 = 18;

/// Base units per whole token (10^18)
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Largest single amount and largest total supply, in base units.
///
/// Balances are signed, so everything must fit in `i128`.
pub const MAX_AMOUNT: Amount = i128::MAX as Amount;

/// Convert a human decimal amount into base units.
///
/// Fails with [`Error::InvalidAmount`] for zero, negative, sub-unit or
/// overflowing input.
pub fn to_base_units(human: Decimal) -> Result<Amount> {
    if human.is_sign_negative() && !human.is_zero() {
        return Err(Error::InvalidAmount(format!("{} is negative", human)));
    }

    let truncated = human.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero);
    let mantissa = truncated.mantissa();
    if mantissa <= 0 {
        return Err(if human.is_zero() {
            Error::InvalidAmount("amount must be positive".to_string())
        } else {
            Error::InvalidAmount(format!("{} is below the smallest unit", human))
        });
    }

    // truncated.scale() <= DECIMALS after rounding
    let factor = 10i128.pow(DECIMALS - truncated.scale());
    let units = mantissa
        .checked_mul(factor)
        .ok_or_else(|| Error::InvalidAmount(format!("{} is out of range", human)))?;

    Ok(units as Amount)
}

/// Parse human decimal text (e.g. `"10.5"`) into base units
pub fn parse_base_units(text: &str) -> Result<Amount> {
    let human = Decimal::from_str(text.trim())
        .map_err(|e| Error::InvalidAmount(format!("{:?} is not a decimal: {}", text, e)))?;
    to_base_units(human)
}

/// Convert base units back into an exact human decimal
pub fn to_human(units: Amount) -> Result<Decimal> {
    let signed = i128::try_from(units)
        .map_err(|_| Error::InvalidAmount(format!("{} base units is out of range", units)))?;
    Decimal::try_from_i128_with_scale(signed, DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| Error::InvalidAmount(format!("{} base units is out of range: {}", units, e)))
}

/// Whole tokens contained in `units`, rounded down
pub fn to_whole_tokens(units: Amount) -> Amount {
    units / UNIT
}

/// Base units of `tokens` whole tokens
pub fn from_whole_tokens(tokens: u64) -> Amount {
    tokens as Amount * UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amount() {
        assert_eq!(to_base_units(Decimal::from(10)).unwrap(), 10 * UNIT);
    }

    #[test]
    fn test_fractional_amount() {
        // 4.25
        assert_eq!(
            to_base_units(Decimal::new(425, 2)).unwrap(),
            4_250_000_000_000_000_000
        );
    }

    #[test]
    fn test_truncates_below_smallest_unit() {
        // 0.0000000000000000019 -> 1 unit, the trailing 0.9 unit is lost
        assert_eq!(to_base_units(Decimal::new(19, 19)).unwrap(), 1);
        // 1.0000000000000000009 -> exactly one token
        assert_eq!(parse_base_units("1.0000000000000000009").unwrap(), UNIT);
    }

    #[test]
    fn test_sub_unit_amount_rejected() {
        let err = to_base_units(Decimal::new(9, 19)).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert!(err.to_string().contains("smallest unit"));
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(to_base_units(Decimal::ZERO), Err(Error::InvalidAmount(_))));
        assert!(matches!(to_base_units(Decimal::new(-5, 0)), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_overflow_rejected() {
        // 10^27 tokens = 10^45 base units, beyond i128
        let huge = Decimal::from_str("1000000000000000000000000000").unwrap();
        assert!(matches!(to_base_units(huge), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_base_units("ten"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_base_units(""), Err(Error::InvalidAmount(_))));
        assert_eq!(parse_base_units(" 2.5 ").unwrap(), 2 * UNIT + UNIT / 2);
    }

    #[test]
    fn test_to_human() {
        assert_eq!(to_human(6 * UNIT).unwrap(), Decimal::from(6));
        assert_eq!(to_human(1).unwrap(), Decimal::new(1, 18));
    }

    #[test]
    fn test_whole_tokens_floor() {
        assert_eq!(to_whole_tokens(6 * UNIT + UNIT - 1), 6);
        assert_eq!(from_whole_tokens(500_000_000), 500_000_000 * UNIT);
    }
}
