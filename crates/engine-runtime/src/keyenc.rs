use model::row::Row;

/// Encodes an upsert-key tuple as the JSON array of its column values, in
/// declared order (§4.4 delete-detection sub-procedure: "Canonical key
/// encoding"). Preserves ordering and distinguishes `"1"` from `1` even when
/// a source integer arrives as a string (`Value::BigIntString`), since
/// `Value::to_canonical_json` maps both to the JSON string form.
pub fn canonical_key(row: &Row, key_columns: &[String]) -> String {
    let values = row.project(key_columns);
    let array = serde_json::Value::Array(values.iter().map(|v| v.to_canonical_json()).collect());
    array.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::value::Value;

    #[test]
    fn string_and_big_int_string_collide_by_design() {
        let mut a = Row::new();
        a.insert("id", Value::String("1".into()));
        let mut b = Row::new();
        b.insert("id", Value::BigIntString("1".into()));
        let cols = vec!["id".to_string()];
        assert_eq!(canonical_key(&a, &cols), canonical_key(&b, &cols));
    }

    #[test]
    fn composite_key_preserves_column_order() {
        let mut row = Row::new();
        row.insert("b", Value::Int(2));
        row.insert("a", Value::Int(1));
        let key = canonical_key(&row, &["a".to_string(), "b".to_string()]);
        assert_eq!(key, "[1,2]");
    }
}
