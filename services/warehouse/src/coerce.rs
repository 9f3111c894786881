//! Best-effort value coercion.
//!
//! Nothing here fails: a value that cannot be converted becomes `Value::Null`
//! and the row it belongs to is kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::table::{SemanticType, Value};

/// Date layouts tried in order. The first match wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a numeric literal. Integers stay integers.
pub fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(Value::Real(f)),
        _ => None,
    }
}

/// Coerce a single cell to a number.
pub fn to_number(value: &Value) -> Value {
    match value {
        Value::Integer(_) => value.clone(),
        Value::Real(f) if f.is_finite() => value.clone(),
        Value::Text(s) => parse_number(s).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Parse a calendar date from text.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    // Offset timestamps keep the calendar date as written.
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Coerce a single cell to a calendar date.
///
/// Integer cells are read as `YYYYMMDD`.
pub fn to_date(value: &Value) -> Value {
    let parsed = match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_date(s),
        Value::Integer(i) => NaiveDate::parse_from_str(&i.to_string(), "%Y%m%d").ok(),
        _ => None,
    };
    parsed.map_or(Value::Null, Value::Date)
}

/// Product of two numeric cells, missing if either side is missing.
pub fn multiply(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => match x.checked_mul(*y) {
            Some(p) => Value::Integer(p),
            None => Value::Real(*x as f64 * *y as f64),
        },
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Real(x * y),
            _ => Value::Null,
        },
    }
}

/// Settle a numeric column on one storage class.
///
/// A column stays `Integer` only when every present value is an integer;
/// otherwise all integers are promoted to reals.
pub fn settle_numeric(values: Vec<Value>) -> (SemanticType, Vec<Value>) {
    let all_integer = values
        .iter()
        .all(|v| matches!(v, Value::Integer(_) | Value::Null));
    if all_integer {
        return (SemanticType::Integer, values);
    }
    let promoted = values
        .into_iter()
        .map(|v| match v {
            Value::Integer(i) => Value::Real(i as f64),
            other => other,
        })
        .collect();
    (SemanticType::Real, promoted)
}
