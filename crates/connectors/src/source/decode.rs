use model::field::{FieldClass, SchemaField};
use model::value::Value;

/// Safe-integer range mirroring JS/JSON-number precision, per §4.1: integers
/// outside this range are preserved as `BigIntString` rather than collapsed to
/// a lossy float.
const SAFE_INT_MAX: i64 = 9_007_199_254_740_991;
const SAFE_INT_MIN: i64 = -9_007_199_254_740_991;

/// Decodes one warehouse result cell. The wire format carries every cell as a
/// JSON string regardless of declared type (the warehouse's own REST
/// convention), so the schema's declared class drives interpretation.
pub fn decode_cell(field: &SchemaField, raw: &serde_json::Value, force_string: bool) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    let text = match raw {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.is_empty() {
        return Value::Null;
    }

    if force_string {
        return Value::BigIntString(text);
    }

    match field.class {
        FieldClass::Int => match text.parse::<i64>() {
            Ok(v) if (SAFE_INT_MIN..=SAFE_INT_MAX).contains(&v) => Value::Int(v),
            _ => Value::BigIntString(text),
        },
        FieldClass::Float => text.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        FieldClass::Bool => match text.as_str() {
            "true" | "TRUE" | "1" => Value::Boolean(true),
            "false" | "FALSE" | "0" => Value::Boolean(false),
            _ => Value::Null,
        },
        FieldClass::Date => chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::String(text)),
        FieldClass::DateTime => chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S"))
            .map(Value::DateTime)
            .unwrap_or(Value::String(text)),
        FieldClass::Timestamp => text
            .parse::<f64>()
            .map(|epoch_secs| {
                chrono::DateTime::from_timestamp(
                    epoch_secs.trunc() as i64,
                    ((epoch_secs.fract()) * 1_000_000_000.0) as u32,
                )
                .map(Value::Timestamp)
                .unwrap_or(Value::String(text.clone()))
            })
            .unwrap_or(Value::String(text)),
        FieldClass::Numeric => text
            .parse::<bigdecimal::BigDecimal>()
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        FieldClass::String => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_integer_becomes_big_int_string() {
        let field = SchemaField::new("id", FieldClass::Int, true);
        let raw = serde_json::Value::String("9223372036854775807".into());
        assert_eq!(
            decode_cell(&field, &raw, false),
            Value::BigIntString("9223372036854775807".into())
        );
    }

    #[test]
    fn in_range_integer_stays_native() {
        let field = SchemaField::new("id", FieldClass::Int, true);
        let raw = serde_json::Value::String("42".into());
        assert_eq!(decode_cell(&field, &raw, false), Value::Int(42));
    }

    #[test]
    fn empty_string_is_null() {
        let field = SchemaField::new("note", FieldClass::String, true);
        let raw = serde_json::Value::String(String::new());
        assert_eq!(decode_cell(&field, &raw, false), Value::Null);
    }

    #[test]
    fn timestamp_epoch_seconds_parsed() {
        let field = SchemaField::new("seen_at", FieldClass::Timestamp, true);
        let raw = serde_json::Value::String("1700000000".into());
        match decode_cell(&field, &raw, false) {
            Value::Timestamp(_) => {}
            other => panic!("expected Timestamp, got {other:?}"),
        }
    }
}
