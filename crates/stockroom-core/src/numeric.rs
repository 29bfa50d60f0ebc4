//! # Numeric Normalizer
//!
//! Reads numbers the way people type them into spreadsheets and forms:
//! `1 234,56`, `€1.234,56`, `1,234.56`, `12.5 kg`.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Keep only  0-9 , . - +                                             │
//! │  2. Both , and . present → the rightmost one is the decimal point,    │
//! │     the other is a thousands separator and is dropped                  │
//! │  3. Only , present       → every , becomes .                           │
//! │  4. Several . left       → only the last one is the decimal point      │
//! │                                                                         │
//! │  "1 234,56"   → "1234.56"                                              │
//! │  "1.234,56"   → "1234.56"                                              │
//! │  "1,234.56"   → "1234.56"                                              │
//! │  "12.34.56"   → "1234.56"                                              │
//! │  ""           → ""          (callers read this as zero)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`parse_number`] never fails: malformed input reads as `0.0`. Use
//! [`try_parse_number`] where a bad value must be told apart from zero
//! (bulk import skips such rows).

/// Normalizes a locale-flexible numeric string into `[-+]digits[.digits]`.
///
/// ## Example
/// ```rust
/// use stockroom_core::numeric::normalize;
///
/// assert_eq!(normalize("1 234,56"), "1234.56");
/// assert_eq!(normalize("12.34.56"), "1234.56");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'))
        .collect();

    if cleaned.is_empty() {
        return cleaned;
    }

    let mut normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    if normalized.matches('.').count() > 1 {
        if let Some(last) = normalized.rfind('.') {
            let int_part = normalized[..last].replace('.', "");
            let frac_part = normalized[last + 1..].replace('.', "");
            normalized = format!("{}.{}", int_part, frac_part);
        }
    }

    normalized
}

/// Parses a numeric string, returning `None` for blank or malformed input.
pub fn try_parse_number(raw: &str) -> Option<f64> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a numeric string; blank or malformed input degrades to `0.0`.
///
/// ## Example
/// ```rust
/// use stockroom_core::numeric::parse_number;
///
/// assert_eq!(parse_number("12,5"), 12.5);
/// assert_eq!(parse_number("n/a"), 0.0);
/// ```
pub fn parse_number(raw: &str) -> f64 {
    try_parse_number(raw).unwrap_or(0.0)
}

/// Rounds to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decimal places kept on stock weights.
pub const WEIGHT_DECIMALS: i32 = 6;

/// Rounds a stock weight to [`WEIGHT_DECIMALS`] places.
///
/// Reserve and release both store rounded values, so releasing exactly
/// what was reserved restores the prior figure.
pub fn round_weight(value: f64) -> f64 {
    let scale = 10f64.powi(WEIGHT_DECIMALS);
    (value * scale).round() / scale
}

// =============================================================================
// Tolerant Serde Decoding
// =============================================================================

/// Serde helpers accepting either a JSON number or a numeric string.
///
/// ## Usage
/// ```rust
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Allocation {
///     #[serde(with = "stockroom_core::numeric::flexible_f64")]
///     weight: f64,
/// }
///
/// let a: Allocation = serde_json::from_str(r#"{"weight": "12,5"}"#).unwrap();
/// assert_eq!(a.weight, 12.5);
/// ```
pub mod flexible_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) if s.trim().is_empty() => Ok(0.0),
            NumberOrString::Text(s) => super::try_parse_number(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid numeric value: {:?}", s))),
        }
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(*value)
    }
}

/// Integer flavour of [`flexible_f64`]; fractional input is truncated.
pub mod flexible_i64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntegerOrString {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match IntegerOrString::deserialize(deserializer)? {
            IntegerOrString::Integer(n) => Ok(n),
            IntegerOrString::Float(f) => Ok(f.trunc() as i64),
            IntegerOrString::Text(s) if s.trim().is_empty() => Ok(0),
            IntegerOrString::Text(s) => super::try_parse_number(&s)
                .map(|f| f.trunc() as i64)
                .ok_or_else(|| de::Error::custom(format!("invalid integer value: {:?}", s))),
        }
    }

    pub fn serialize<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(*value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("1 234,56"), "1234.56");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("12.34.56"), "1234.56");
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize("1.234,56"), "1234.56");
        assert_eq!(normalize("1,234.56"), "1234.56");
        assert_eq!(normalize("€ 419,57"), "419.57");
        assert_eq!(normalize("1,234,567"), "1234.567");
        assert_eq!(normalize("  -3,5 "), "-3.5");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("kg"), "");
    }

    #[test]
    fn test_parse_number_degrades_to_zero() {
        assert_eq!(parse_number("12,5"), 12.5);
        assert_eq!(parse_number("+7"), 7.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number("--"), 0.0);
    }

    #[test]
    fn test_try_parse_number() {
        assert_eq!(try_parse_number("100"), Some(100.0));
        assert_eq!(try_parse_number(""), None);
        assert_eq!(try_parse_number("1-2"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(-2.345_6), -2.35);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn test_round_weight_restores_after_release() {
        let stock = 0.3;
        let reserved = round_weight(stock - 0.1);
        assert_eq!(round_weight(reserved + 0.1), stock);
        assert_eq!(round_weight(1.234_567_89), 1.234_568);
    }

    #[derive(Deserialize)]
    struct Sample {
        #[serde(with = "flexible_f64")]
        weight: f64,
        #[serde(with = "flexible_i64")]
        article: i64,
    }

    #[test]
    fn test_flexible_decoding() {
        let s: Sample = serde_json::from_str(r#"{"weight": "1 234,5", "article": "42"}"#).unwrap();
        assert_eq!(s.weight, 1234.5);
        assert_eq!(s.article, 42);

        let s: Sample = serde_json::from_str(r#"{"weight": 3, "article": 7.9}"#).unwrap();
        assert_eq!(s.weight, 3.0);
        assert_eq!(s.article, 7);

        let s: Sample = serde_json::from_str(r#"{"weight": "", "article": ""}"#).unwrap();
        assert_eq!(s.weight, 0.0);
        assert_eq!(s.article, 0);

        assert!(serde_json::from_str::<Sample>(r#"{"weight": "abc", "article": 1}"#).is_err());
    }
}
