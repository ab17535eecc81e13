use super::error::CoreError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Round to whole cents, half away from zero. The result always has scale 2.
pub fn round_cents(amount: Decimal) -> Decimal {
    to_cents(amount, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate to whole cents toward zero. The result always has scale 2.
pub fn floor_cents(amount: Decimal) -> Decimal {
    to_cents(amount, RoundingStrategy::ToZero)
}

fn to_cents(amount: Decimal, strategy: RoundingStrategy) -> Decimal {
    let mut cents = amount.round_dp_with_strategy(2, strategy);
    cents.rescale(2);
    cents
}

/// True when `amount` has no fraction of a cent.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

/// `a + b`, or `AmountOverflow` naming the total being computed.
pub fn checked_add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, CoreError> {
    a.checked_add(b)
        .ok_or_else(|| CoreError::AmountOverflow(what.to_string()))
}

/// `a * b`, or `AmountOverflow` naming the value being computed.
pub fn checked_mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, CoreError> {
    a.checked_mul(b)
        .ok_or_else(|| CoreError::AmountOverflow(what.to_string()))
}

/// Parse a statement amount such as `1,234.50`, `$12.00` or `(45.10)`.
///
/// Blank input is `Ok(None)`; anything else that is not a number is an error.
pub fn parse_amount(raw: &str) -> Result<Option<Decimal>, rust_decimal::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body.chars().filter(|c| *c != ',' && *c != '$').collect();
    let value = Decimal::from_str(cleaned.trim())?;
    Ok(Some(if negative { -value } else { value }))
}

/// Format as Canadian dollars, e.g. `$1,380.00` or `-$12.50`.
pub fn format_cad(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{cents}")
}
