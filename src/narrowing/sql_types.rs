//! Candidate SQL column types and the round-trip probe.
//!
//! Each candidate knows how to cast a textual value to itself and render the result back to
//! text, the way a SQL engine evaluates `CAST(CAST(v AS <type>) AS LONGVARCHAR)`. A column fits
//! a candidate when every non-null value survives that round trip: the rendered text must start
//! with the original value, compared case-insensitively. The prefix rule tolerates padding such
//! as `2024-01-31` → `2024-01-31 00:00:00.000000` or `0.5` → `0.50`.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

/// A SQL column type the narrower can move a column to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Timestamp,
    Uuid,
    SmallInt,
    Integer,
    BigInt,
    /// Exact numeric with total digits and digits after the point.
    Decimal { precision: u32, scale: u32 },
    Boolean,
    /// The wide text type every loaded column starts as.
    LongVarchar,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Timestamp => f.write_str("TIMESTAMP"),
            SqlType::Uuid => f.write_str("UUID"),
            SqlType::SmallInt => f.write_str("SMALLINT"),
            SqlType::Integer => f.write_str("INTEGER"),
            SqlType::BigInt => f.write_str("BIGINT"),
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            SqlType::Boolean => f.write_str("BOOLEAN"),
            SqlType::LongVarchar => f.write_str("LONGVARCHAR"),
        }
    }
}

/// A value that cannot be represented in the target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot cast '{value}' to {sql_type}: {reason}")]
pub struct CastError {
    pub value: String,
    pub sql_type: SqlType,
    pub reason: String,
}

/// Probing order, narrowest and most specific first.
///
/// Temporal and UUID come before numbers so date-like or hex-like strings are not read as
/// numbers. Integers come before decimals because the prefix comparison would otherwise let a
/// decimal claim every integer column (`42` → `42.000`). Within a family the tightest type is
/// listed first.
pub const DEFAULT_CANDIDATES: [SqlType; 9] = [
    SqlType::Timestamp,
    SqlType::Uuid,
    SqlType::SmallInt,
    SqlType::Integer,
    SqlType::BigInt,
    SqlType::Decimal { precision: 2, scale: 2 },
    SqlType::Decimal { precision: 10, scale: 3 },
    SqlType::Decimal { precision: 14, scale: 6 },
    SqlType::Boolean,
];

const TIMESTAMP_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

impl SqlType {
    /// Cast `raw` to this type and render it back as text.
    pub fn cast_text(&self, raw: &str) -> Result<String, CastError> {
        let value = raw.trim();
        let err = |reason: &str| CastError {
            value: raw.to_string(),
            sql_type: *self,
            reason: reason.to_string(),
        };

        match self {
            SqlType::LongVarchar => Ok(raw.to_string()),
            SqlType::Timestamp => parse_timestamp(value)
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
                .ok_or_else(|| err("invalid datetime format")),
            SqlType::Uuid => Uuid::parse_str(value)
                .map(|u| u.hyphenated().to_string())
                .map_err(|e| err(&e.to_string())),
            SqlType::SmallInt => cast_integer(value, i16::MIN.into(), i16::MAX.into()).map_err(err),
            SqlType::Integer => cast_integer(value, i32::MIN.into(), i32::MAX.into()).map_err(err),
            SqlType::BigInt => cast_integer(value, i64::MIN, i64::MAX).map_err(err),
            SqlType::Decimal { precision, scale } => cast_decimal(value, *precision, *scale).map_err(err),
            SqlType::Boolean => match value.to_ascii_lowercase().as_str() {
                "true" => Ok("TRUE".to_string()),
                "false" => Ok("FALSE".to_string()),
                _ => Err(err("invalid boolean")),
            },
        }
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn cast_integer(value: &str, min: i64, max: i64) -> Result<String, &'static str> {
    let n = value
        .parse::<i64>()
        .map_err(|_| "invalid character value for cast")?;
    if n < min || n > max {
        return Err("numeric value out of range");
    }
    Ok(n.to_string())
}

fn cast_decimal(value: &str, precision: u32, scale: u32) -> Result<String, &'static str> {
    let numeric_chars = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if value.is_empty() || !value.chars().all(numeric_chars) {
        return Err("invalid character value for cast");
    }
    let n = value
        .parse::<f64>()
        .map_err(|_| "invalid character value for cast")?;
    if !n.is_finite() {
        return Err("invalid character value for cast");
    }

    let rendered = format!("{:.*}", scale as usize, n);
    let integer_digits = rendered
        .trim_start_matches('-')
        .split('.')
        .next()
        .unwrap_or_default()
        .trim_start_matches('0')
        .len() as u32;
    if integer_digits > precision.saturating_sub(scale) {
        return Err("precision or scale out of range");
    }
    Ok(rendered)
}

/// Whether a cast-and-back value still carries the original text.
pub fn round_trips(original: &str, casted: &str) -> bool {
    casted.to_lowercase().starts_with(&original.to_lowercase())
}

/// Whether every non-null value round-trips through `candidate`.
///
/// A failed cast means "does not fit"; it is logged at trace level only.
pub fn probe<'v, I>(candidate: &SqlType, values: I) -> bool
where
    I: IntoIterator<Item = Option<&'v str>>,
{
    for value in values.into_iter().flatten() {
        match candidate.cast_text(value) {
            Ok(casted) if round_trips(value, &casted) => {}
            Ok(casted) => {
                tracing::trace!(%candidate, value, %casted, "does not fit: cast loses information");
                return false;
            }
            Err(e) => {
                tracing::trace!(%candidate, error = %e, "does not fit");
                return false;
            }
        }
    }
    true
}
