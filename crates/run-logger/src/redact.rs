use std::collections::BTreeMap;

const MAX_VALUE_LEN: usize = 1000;
const SENSITIVE_PATTERN: &[&str] = &["key", "token", "password", "secret", "credential", "auth"];
const PLACEHOLDER: &str = "[REDACTED]";

/// Redacts a LogEntry metadata map before persistence (§4.5, §9 credential
/// handling): any key matching `key|token|password|secret|credential|auth`
/// (case-insensitive) is replaced wholesale; long string values are
/// truncated with an ellipsis; cyclic structures collapse to an error marker.
pub fn redact_metadata(
    metadata: BTreeMap<String, serde_json::Value>,
) -> BTreeMap<String, serde_json::Value> {
    metadata
        .into_iter()
        .map(|(key, value)| {
            if is_sensitive_key(&key) {
                (key, serde_json::Value::String(PLACEHOLDER.to_string()))
            } else {
                (key, redact_value(value, 0))
            }
        })
        .collect()
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_PATTERN.iter().any(|p| lower.contains(p))
}

/// Depth guard stands in for true cycle detection: `serde_json::Value` is a
/// tree, not a graph, so it cannot actually cycle, but a sufficiently deep
/// structure is treated the same way the original system treats a cycle.
const MAX_DEPTH: usize = 32;

fn redact_value(value: serde_json::Value, depth: usize) -> serde_json::Value {
    if depth > MAX_DEPTH {
        return serde_json::json!({ "error": "circular" });
    }
    match value {
        serde_json::Value::String(s) if s.len() > MAX_VALUE_LEN => {
            let mut truncated: String = s.chars().take(MAX_VALUE_LEN).collect();
            truncated.push('\u{2026}');
            serde_json::Value::String(truncated)
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if is_sensitive_key(&k) {
                        (k, serde_json::Value::String(PLACEHOLDER.to_string()))
                    } else {
                        (k, redact_value(v, depth + 1))
                    }
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(|v| redact_value(v, depth + 1)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_key_is_replaced_with_placeholder() {
        let mut metadata = BTreeMap::new();
        metadata.insert("apiKey".to_string(), serde_json::json!("super-secret"));
        let redacted = redact_metadata(metadata);
        assert_eq!(redacted["apiKey"], serde_json::json!(PLACEHOLDER));
    }

    #[test]
    fn long_string_is_truncated_with_ellipsis() {
        let mut metadata = BTreeMap::new();
        metadata.insert("note".to_string(), serde_json::json!("x".repeat(2000)));
        let redacted = redact_metadata(metadata);
        let value = redacted["note"].as_str().unwrap();
        assert!(value.ends_with('\u{2026}'));
        assert_eq!(value.chars().count(), MAX_VALUE_LEN + 1);
    }

    #[test]
    fn deeply_nested_structure_collapses_to_circular_marker() {
        let mut current = serde_json::json!("leaf");
        for _ in 0..(MAX_DEPTH + 5) {
            current = serde_json::json!({ "child": current });
        }
        let mut metadata = BTreeMap::new();
        metadata.insert("tree".to_string(), current);
        let redacted = redact_metadata(metadata);

        let mut cursor = &redacted["tree"];
        loop {
            match cursor {
                serde_json::Value::Object(map) if map.contains_key("error") => {
                    assert_eq!(map["error"], serde_json::json!("circular"));
                    break;
                }
                serde_json::Value::Object(map) => cursor = &map["child"],
                other => panic!("expected nested object, got {other:?}"),
            }
        }
    }
}
