mod ddl;
mod error;

pub use error::ReconcileError;

use model::field::{Schema, SchemaField};

/// Column names are compared case-insensitively; `synced_at` is engine-owned
/// and never reported as drift (I5).
const ENGINE_OWNED_COLUMN: &str = "synced_at";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDrift {
    pub to_add: Vec<SchemaField>,
    pub to_drop: Vec<SchemaField>,
}

impl SchemaDrift {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_drop.is_empty()
    }
}

/// Compares source and sink schemas, case-insensitively (§4.3).
pub fn detect_changes(source_fields: &Schema, sink_fields: &Schema) -> SchemaDrift {
    let to_add = source_fields
        .fields
        .iter()
        .filter(|f| !sink_fields.contains(&f.name))
        .cloned()
        .collect();

    let to_drop = sink_fields
        .fields
        .iter()
        .filter(|f| {
            !f.name.eq_ignore_ascii_case(ENGINE_OWNED_COLUMN) && !source_fields.contains(&f.name)
        })
        .cloned()
        .collect();

    SchemaDrift { to_add, to_drop }
}

/// Every declared upsert column must exist in the source schema (case-insensitive).
pub fn validate_upsert_keys(upsert_columns: &[String], source_fields: &Schema) -> Result<(), ReconcileError> {
    let invalid: Vec<String> = upsert_columns
        .iter()
        .filter(|c| !source_fields.contains(c))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::ConfigInvalid(format!(
            "upsert columns not present in source schema: {}",
            invalid.join(", ")
        )))
    }
}

pub use ddl::{create_table_statement, drop_column_statements, add_column_statements};

#[cfg(test)]
mod tests {
    use super::*;
    use model::field::FieldClass;

    fn field(name: &str) -> SchemaField {
        SchemaField::new(name, FieldClass::String, true)
    }

    #[test]
    fn synced_at_never_reported_as_drift() {
        let source = Schema::new(vec![field("id")]);
        let sink = Schema::new(vec![field("id"), field("synced_at")]);
        let drift = detect_changes(&source, &sink);
        assert!(drift.to_drop.is_empty());
    }

    #[test]
    fn detects_added_and_dropped_columns_case_insensitively() {
        let source = Schema::new(vec![field("Id"), field("Note")]);
        let sink = Schema::new(vec![field("id"), field("legacy_flag")]);
        let drift = detect_changes(&source, &sink);
        assert_eq!(drift.to_add.len(), 1);
        assert_eq!(drift.to_add[0].name, "Note");
        assert_eq!(drift.to_drop.len(), 1);
        assert_eq!(drift.to_drop[0].name, "legacy_flag");
    }

    #[test]
    fn validate_upsert_keys_rejects_unknown_column() {
        let source = Schema::new(vec![field("id")]);
        let result = validate_upsert_keys(&["id".to_string(), "ghost".to_string()], &source);
        assert!(matches!(result, Err(ReconcileError::ConfigInvalid(_))));
    }
}
