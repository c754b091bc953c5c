use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// A single cell read from the source or destined for the sink.
///
/// `Value` is the type-preserving carrier the design notes require: large source
/// integers and force-stringed columns arrive as `Value::BigIntString` rather than
/// being collapsed into a lossy `f64`/`i64`, and `Null` is distinct from "absent".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    Int(i64),
    /// An integer that either overflowed the safe-integer range or whose column was
    /// in the job's `force_string_fields` set. Carries the original decimal text.
    BigIntString(String),
    Float(f64),
    Decimal(BigDecimal),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::BigIntString(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string form used for the delete-detection key encoding and for log
    /// redaction length checks. Distinguishes `"1"` from `1`: the caller must use
    /// `to_canonical_json` (below) when that distinction matters, not this method.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::BigIntString(s) => s.clone(),
            Value::Float(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Boolean(v) => v.to_string(),
            Value::Date(v) => v.to_string(),
            Value::DateTime(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339(),
            Value::Json(v) => v.to_string(),
            Value::Null => "NULL".to_string(),
        }
    }

    /// Serializes to a `serde_json::Value`, preserving the int/string distinction
    /// (i.e. `Value::BigIntString("1")` becomes the JSON string `"1"`, never the
    /// JSON number `1`) so canonical key encoding is unambiguous.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::BigIntString(s) => serde_json::Value::String(s.clone()),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal(v) => serde_json::Value::String(v.to_string()),
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Date(v) => serde_json::Value::String(v.to_string()),
            Value::DateTime(v) => serde_json::Value::String(v.to_string()),
            Value::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            Value::Json(v) => v.clone(),
            Value::Null => serde_json::Value::Null,
        }
    }

    pub fn as_big_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Int(v) => Some(BigDecimal::from(*v)),
            Value::BigIntString(s) => BigDecimal::from_str(s).ok(),
            Value::Decimal(v) => Some(v.clone()),
            Value::Float(v) => BigDecimal::from_str(&v.to_string()).ok(),
            Value::String(s) => BigDecimal::from_str(s).ok(),
            _ => None,
        }
    }

    /// Ordering used by the compound cursor predicate: numeric-ish values compare
    /// numerically, everything else falls back to lexical/chronological comparison.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_big_decimal(), other.as_big_decimal()) {
            return Some(a.cmp(&b));
        }
        use Value::*;
        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_int_string_is_not_confused_with_string_one() {
        let a = Value::BigIntString("1".into());
        let b = Value::String("1".into());
        // Distinct variants, but canonical JSON form is deliberately identical
        // (both become the JSON string "1") so a key built from either source
        // representation of the same logical value compares equal.
        assert_eq!(a.to_canonical_json(), b.to_canonical_json());
    }

    #[test]
    fn numeric_compare_crosses_representations() {
        let a = Value::Int(10);
        let b = Value::BigIntString("10".into());
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }
}
