use model::value::Value;

/// Converts a JSON value returned by the sink's RPC surface into the engine's
/// type-preserving carrier. Unlike the source decoder, there is no schema class
/// to guide interpretation here; the JSON wire type is authoritative.
pub fn json_to_value(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                n.as_f64().map(Value::Float).unwrap_or(Value::Null)
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::Json(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_number_literal_stays_integer_when_representable() {
        let raw: serde_json::Value = serde_json::from_str("42").unwrap();
        assert_eq!(json_to_value(&raw), Value::Int(42));
    }

    #[test]
    fn null_maps_to_null() {
        assert_eq!(json_to_value(&serde_json::Value::Null), Value::Null);
    }
}
