//! Scalar values and column types.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Declared type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Datetime,
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Number => write!(f, "number"),
            ColumnType::Datetime => write!(f, "datetime"),
            ColumnType::Bool => write!(f, "bool"),
        }
    }
}

/// A scalar cell value. Datetimes are carried as RFC 3339 strings and
/// compared chronologically when the column is typed `Datetime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the runtime type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Whether this literal is acceptable for a column of type `ty`.
    ///
    /// `Null` is acceptable anywhere. A `Datetime` column accepts only
    /// strings that parse as RFC 3339.
    pub fn matches_type(&self, ty: ColumnType) -> bool {
        match (self, ty) {
            (Value::Null, _) => true,
            (Value::String(_), ColumnType::String) => true,
            (Value::String(s), ColumnType::Datetime) => parse_datetime(s).is_some(),
            (Value::Number(_), ColumnType::Number) => true,
            (Value::Bool(_), ColumnType::Bool) => true,
            _ => false,
        }
    }

    /// Coerce a raw JSON value from a remote record into a `Value` of the
    /// declared column type.
    ///
    /// Values that cannot be represented under the declared type (composite
    /// JSON, unparseable datetimes, non-numeric strings in number columns)
    /// collapse to `Null` rather than failing the whole result set.
    pub fn coerce(raw: &serde_json::Value, ty: ColumnType) -> Value {
        match (raw, ty) {
            (serde_json::Value::Null, _) => Value::Null,
            (serde_json::Value::String(s), ColumnType::String) => Value::String(s.clone()),
            (serde_json::Value::Number(n), ColumnType::String) => Value::String(n.to_string()),
            (serde_json::Value::Bool(b), ColumnType::String) => Value::String(b.to_string()),
            (serde_json::Value::Number(n), ColumnType::Number) => {
                n.as_f64().map(Value::Number).unwrap_or(Value::Null)
            }
            (serde_json::Value::String(s), ColumnType::Number) => {
                s.trim().parse::<f64>().map(Value::Number).unwrap_or(Value::Null)
            }
            (serde_json::Value::String(s), ColumnType::Datetime) => match parse_datetime(s) {
                Some(dt) => Value::String(dt.to_rfc3339()),
                None => Value::Null,
            },
            (serde_json::Value::Bool(b), ColumnType::Bool) => Value::Bool(*b),
            (serde_json::Value::String(s), ColumnType::Bool) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if *n == n.floor() && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// Parse an RFC 3339 timestamp, tolerating a missing offset (assumed UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    // Bare "YYYY-MM-DDTHH:MM:SS" without offset
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Equality between a row value and a literal under the column's type.
///
/// `Null` equals only `Null`.
pub fn values_equal(lhs: &Value, rhs: &Value, ty: ColumnType) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) if ty == ColumnType::Datetime => {
            match (parse_datetime(a), parse_datetime(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            }
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// Ordering between a row value and a literal under the column's type:
/// numeric for `Number`, chronological for `Datetime`, lexicographic for
/// `String`. Returns `None` when either side is `Null` or the runtime
/// types do not line up.
pub fn compare_values(lhs: &Value, rhs: &Value, ty: ColumnType) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) if ty == ColumnType::Datetime => {
            match (parse_datetime(a), parse_datetime(b)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(a.cmp(b)),
            }
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_string_column() {
        let v = Value::coerce(&serde_json::json!("active"), ColumnType::String);
        assert_eq!(v, Value::String("active".to_string()));
        let v = Value::coerce(&serde_json::json!(3), ColumnType::String);
        assert_eq!(v, Value::String("3".to_string()));
    }

    #[test]
    fn test_coerce_number_column() {
        let v = Value::coerce(&serde_json::json!(42), ColumnType::Number);
        assert_eq!(v, Value::Number(42.0));
        let v = Value::coerce(&serde_json::json!("19.5"), ColumnType::Number);
        assert_eq!(v, Value::Number(19.5));
        let v = Value::coerce(&serde_json::json!("not a number"), ColumnType::Number);
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn test_coerce_datetime_column() {
        let v = Value::coerce(&serde_json::json!("2024-06-01T12:00:00Z"), ColumnType::Datetime);
        assert!(matches!(v, Value::String(_)));
        let v = Value::coerce(&serde_json::json!("yesterday"), ColumnType::Datetime);
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn test_coerce_bool_column() {
        assert_eq!(Value::coerce(&serde_json::json!(true), ColumnType::Bool), Value::Bool(true));
        assert_eq!(
            Value::coerce(&serde_json::json!("false"), ColumnType::Bool),
            Value::Bool(false)
        );
        assert_eq!(Value::coerce(&serde_json::json!("yes"), ColumnType::Bool), Value::Null);
    }

    #[test]
    fn test_coerce_composite_drops_to_null() {
        let v = Value::coerce(&serde_json::json!({"a": 1}), ColumnType::String);
        assert_eq!(v, Value::Null);
        let v = Value::coerce(&serde_json::json!([1, 2]), ColumnType::Number);
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn test_matches_type() {
        assert!(Value::String("x".into()).matches_type(ColumnType::String));
        assert!(Value::Number(1.0).matches_type(ColumnType::Number));
        assert!(Value::Null.matches_type(ColumnType::Bool));
        assert!(!Value::Number(1.0).matches_type(ColumnType::String));
        assert!(Value::String("2024-01-01T00:00:00Z".into()).matches_type(ColumnType::Datetime));
        assert!(!Value::String("not a date".into()).matches_type(ColumnType::Datetime));
    }

    #[test]
    fn test_compare_numeric() {
        let a = Value::Number(2.0);
        let b = Value::Number(10.0);
        assert_eq!(compare_values(&a, &b, ColumnType::Number), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_lexicographic() {
        // "10" < "2" as strings, the opposite of numeric order
        let a = Value::String("10".into());
        let b = Value::String("2".into());
        assert_eq!(compare_values(&a, &b, ColumnType::String), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_datetime_chronological() {
        let a = Value::String("2024-06-01T00:00:00+02:00".into());
        let b = Value::String("2024-06-01T00:00:00Z".into());
        // +02:00 is two hours before the UTC midnight
        assert_eq!(compare_values(&a, &b, ColumnType::Datetime), Some(Ordering::Less));
    }

    #[test]
    fn test_null_equality() {
        assert!(values_equal(&Value::Null, &Value::Null, ColumnType::String));
        assert!(!values_equal(&Value::Null, &Value::String("x".into()), ColumnType::String));
        assert_eq!(compare_values(&Value::Null, &Value::Number(1.0), ColumnType::Number), None);
    }

    #[test]
    fn test_parse_datetime_without_offset() {
        assert!(parse_datetime("2024-03-05T08:30:00").is_some());
        assert!(parse_datetime("2024-03-05T08:30:00.123").is_some());
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let v: Value = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(v, Value::String("abc".into()));
        let v: Value = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, Value::Number(3.5));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("null").unwrap();
        assert_eq!(v, Value::Null);
    }
}
