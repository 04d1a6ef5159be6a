//! Conversion between whole-token decimal strings and smallest units.

use crate::constants::{DECIMALS, TOKEN};
use crate::error::AmountParseError;

/// Parse a decimal token amount such as `"1.5"` into smallest units.
pub fn parse_tokens(s: &str) -> Result<u128, AmountParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountParseError::Empty);
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountParseError::Empty);
    }
    if frac.len() > DECIMALS as usize {
        return Err(AmountParseError::TooManyDecimals { found: frac.len(), max: DECIMALS });
    }

    let whole_units = digits_to_u128(whole)?
        .checked_mul(TOKEN)
        .ok_or(AmountParseError::Overflow)?;

    let scale = 10u128.pow(DECIMALS - frac.len() as u32);
    let frac_units = digits_to_u128(frac)?
        .checked_mul(scale)
        .ok_or(AmountParseError::Overflow)?;

    whole_units
        .checked_add(frac_units)
        .ok_or(AmountParseError::Overflow)
}

fn digits_to_u128(digits: &str) -> Result<u128, AmountParseError> {
    let mut value: u128 = 0;
    for c in digits.chars() {
        let d = c.to_digit(10).ok_or(AmountParseError::InvalidCharacter(c))?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as u128))
            .ok_or(AmountParseError::Overflow)?;
    }
    Ok(value)
}

/// Format smallest units as a decimal token amount, trimming trailing zeros.
pub fn format_tokens(units: u128) -> String {
    let whole = units / TOKEN;
    let frac = units % TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = DECIMALS as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
