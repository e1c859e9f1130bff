//! Exact conversion between major-unit decimal amounts and integer subunits.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, de};
use serde_json::value::RawValue;

use crate::error::{AppError, Result, msg};

/// Subunits per major unit (paise per rupee, cents per dollar).
pub const SUBUNITS_PER_UNIT: i64 = 100;

/// Convert a major-unit amount into subunits.
///
/// Rejects zero/negative amounts and anything with sub-subunit precision
/// (`19.999`) instead of rounding it.
pub fn to_subunits(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(msg::AMOUNT_NOT_POSITIVE.into()));
    }

    let scaled = amount
        .checked_mul(Decimal::from(SUBUNITS_PER_UNIT))
        .ok_or_else(|| AppError::Validation(msg::AMOUNT_TOO_LARGE.into()))?;

    if !scaled.fract().is_zero() {
        return Err(AppError::Validation(msg::AMOUNT_TOO_PRECISE.into()));
    }

    scaled
        .trunc()
        .to_i64()
        .ok_or_else(|| AppError::Validation(msg::AMOUNT_TOO_LARGE.into()))
}

/// Upper-case a currency code after checking it is three ASCII letters.
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(msg::INVALID_CURRENCY.into()));
    }
    Ok(code.to_ascii_uppercase())
}

fn parse_decimal(text: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str_exact(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| format!("invalid amount: {}", text))
}

/// Parse the exact JSON text of an amount: a number literal or a numeric string.
fn parse_raw_amount(raw: &RawValue) -> std::result::Result<Decimal, String> {
    let text = raw.get().trim();
    if text.starts_with('"') {
        let inner: String = serde_json::from_str(text).map_err(|e| e.to_string())?;
        return parse_decimal(inner.trim());
    }
    if text.starts_with(|c: char| c == '-' || c.is_ascii_digit()) {
        return parse_decimal(text);
    }
    Err(format!("invalid amount: {}", text))
}

/// Deserialize a JSON number or numeric string into an exact `Decimal`.
///
/// The literal is read as written, never through a binary float, so
/// `19.9999999999999999` stays that value and fails the precision check later.
pub fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    parse_raw_amount(&raw).map_err(de::Error::custom)
}

/// Optional variant of [`deserialize_amount`]; use with `#[serde(default)]`.
pub fn deserialize_optional_amount<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Box<RawValue>>::deserialize(deserializer)?;
    raw.map(|raw| parse_raw_amount(&raw))
        .transpose()
        .map_err(de::Error::custom)
}
