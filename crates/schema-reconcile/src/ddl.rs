use model::field::SchemaField;

/// Double-quotes an identifier, doubling any embedded quote (mandatory per §4.3).
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Emits `CREATE TABLE IF NOT EXISTS` with the mapped columns plus the
/// engine-owned `synced_at`, followed by a uniqueness constraint over the
/// upsert columns named `<table>_unique_idx`.
pub fn create_table_statement(table: &str, fields: &[SchemaField], upsert_columns: &[String]) -> Vec<String> {
    let mut column_defs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), f.class.sink_type()))
        .collect();
    column_defs.push("synced_at TIMESTAMPTZ DEFAULT now()".to_string());

    let create = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        column_defs.join(", ")
    );

    let index_name = format!("{table}_unique_idx");
    let index_columns = upsert_columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let unique_index = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(&index_name),
        quote_ident(table),
        index_columns
    );

    vec![create, unique_index]
}

pub fn add_column_statements(table: &str, fields: &[SchemaField]) -> Vec<String> {
    fields
        .iter()
        .map(|f| {
            format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                quote_ident(table),
                quote_ident(&f.name),
                f.class.sink_type()
            )
        })
        .collect()
}

pub fn drop_column_statements(table: &str, fields: &[SchemaField]) -> Vec<String> {
    fields
        .iter()
        .map(|f| {
            format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {}",
                quote_ident(table),
                quote_ident(&f.name)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::field::FieldClass;

    #[test]
    fn create_table_includes_synced_at_and_unique_index() {
        let fields = vec![SchemaField::new("id", FieldClass::Int, false)];
        let statements = create_table_statement("widgets", &fields, &["id".to_string()]);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("synced_at TIMESTAMPTZ DEFAULT now()"));
        assert!(statements[1].contains("\"widgets_unique_idx\""));
    }

    #[test]
    fn identifiers_are_quoted() {
        let fields = vec![SchemaField::new("weird name", FieldClass::String, true)];
        let statements = add_column_statements("widgets", &fields);
        assert_eq!(
            statements[0],
            "ALTER TABLE \"widgets\" ADD COLUMN IF NOT EXISTS \"weird name\" TEXT"
        );
    }
}
