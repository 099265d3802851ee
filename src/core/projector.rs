//! Turns the current amount and cached rates into display values.

use super::currency::{Currency, Pair};
use super::rates::Rate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

/// Fraction digits shown for converted amounts.
pub const DISPLAY_PRECISION: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub currency: Currency,
    /// `amount * rate`, formatted with [`DISPLAY_PRECISION`] digits.
    pub amount: String,
    /// `None` when the pair has not been fetched or its lookup failed.
    pub rate: Option<f64>,
}

/// Parses a user-entered amount.
///
/// Accepts the longest leading decimal number (`"12.5abc"` is 12.5) and
/// falls back to 0 for anything else, including non-finite values.
pub fn parse_amount(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match s[..end].parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Formats `value` with [`DISPLAY_PRECISION`] fraction digits, rounding
/// ties away from zero. Negative zero prints as `0.0000`.
pub fn format_amount(value: f64) -> String {
    // -0.0 + 0.0 == +0.0
    let value = value + 0.0;
    let digits = DISPLAY_PRECISION as usize;
    match Decimal::from_f64_retain(value) {
        Some(d) => {
            let rounded = d.round_dp_with_strategy(
                DISPLAY_PRECISION,
                RoundingStrategy::MidpointAwayFromZero,
            );
            format!("{rounded:.digits$}")
        }
        // Outside Decimal's range; plain float formatting is exact enough there.
        None => format!("{value:.digits$}"),
    }
}

/// Computes the display list for `base`, one entry per other currency in
/// display order. Missing and unavailable rates count as zero.
pub fn project(amount: &str, base: Currency, rates: &HashMap<Pair, Rate>) -> Vec<Conversion> {
    let numeric = parse_amount(amount);
    base.targets()
        .map(|target| {
            let rate = rates
                .get(&Pair::new(base, target))
                .and_then(|r| r.value());
            Conversion {
                currency: target,
                amount: format_amount(numeric * rate.unwrap_or(0.0)),
                rate,
            }
        })
        .collect()
}
