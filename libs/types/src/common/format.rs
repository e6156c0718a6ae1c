//! Display formatting for raw token balances
//!
//! Amounts are rounded toward zero to the requested precision and always show
//! at least two decimal places (`0` renders as `"0.00"`).

use ethers_core::types::U256;
use rust_decimal::{Decimal, RoundingStrategy};

/// Minimum number of fractional digits in a rendered balance
pub const MIN_DISPLAY_DECIMALS: usize = 2;

/// Render `amount` (a raw integer with `decimals` implied places) truncated to
/// `precision` fractional digits
pub fn format_balance(amount: U256, decimals: u32, precision: u32) -> String {
    let rendered = via_decimal(amount, decimals, precision)
        .unwrap_or_else(|| via_digits(amount, decimals, precision));
    pad_to_decimal_places(&rendered, MIN_DISPLAY_DECIMALS)
}

/// Pad the fractional part of a decimal string with zeros
pub fn pad_to_decimal_places(value: &str, places: usize) -> String {
    match value.split_once('.') {
        Some((whole, fraction)) if fraction.len() >= places => format!("{whole}.{fraction}"),
        Some((whole, fraction)) => format!("{whole}.{fraction:0<places$}"),
        None => format!("{value}.{}", "0".repeat(places)),
    }
}

fn via_decimal(amount: U256, decimals: u32, precision: u32) -> Option<String> {
    if amount > U256::from(u128::MAX) {
        return None;
    }
    let mantissa = i128::try_from(amount.as_u128()).ok()?;
    let value = Decimal::try_from_i128_with_scale(mantissa, decimals).ok()?;
    let truncated = value.round_dp_with_strategy(precision, RoundingStrategy::ToZero);
    Some(truncated.normalize().to_string())
}

/// String fallback for amounts that exceed `Decimal`'s 96-bit mantissa
fn via_digits(amount: U256, decimals: u32, precision: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let keep = fraction.len().min(precision as usize);
    let fraction = fraction[..keep].trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{whole}.{fraction}")
    }
}
