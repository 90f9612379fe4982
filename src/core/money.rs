//! Fixed-point money handling.
//!
//! All amounts in the engine are integer cents (`i64`) with exactly two
//! decimal digits of precision. Floating point is never used for balance
//! arithmetic. This module converts between the external decimal-string
//! representation (e.g. `"12.34"`) and cents.

use crate::errors::{Error, Result};

/// Parses a decimal amount string (`"12"`, `"12.3"`, `"12.34"`) into cents.
///
/// At most two decimal digits are accepted; more precision, signs, or any
/// other deviation is rejected, since silently rounding user-supplied money
/// values is worse than an error.
pub fn parse_amount(input: &str) -> Result<i64> {
    let invalid = || Error::InvalidAmount {
        amount: input.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() || whole.chars().any(|c| !c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > 2 || frac.chars().any(|c| !c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_part: i64 = whole.parse().map_err(|_| invalid())?;
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    whole_part
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or_else(invalid)
}

/// Formats cents as a decimal amount string with exactly two decimals.
#[must_use]
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
