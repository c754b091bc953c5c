use serde::{Deserialize, Serialize};

/// Source-typed class for a schema column (§3 Data Model: Schema Field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    String,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    Timestamp,
    Numeric,
}

impl FieldClass {
    /// Type mapping from §4.3: source class -> sink DDL type.
    pub fn sink_type(&self) -> &'static str {
        match self {
            FieldClass::String => "TEXT",
            FieldClass::Int => "BIGINT",
            FieldClass::Float => "DOUBLE PRECISION",
            FieldClass::Bool => "BOOLEAN",
            FieldClass::Date => "DATE",
            FieldClass::DateTime => "TIMESTAMP",
            FieldClass::Timestamp => "TIMESTAMPTZ",
            FieldClass::Numeric => "NUMERIC",
        }
    }

    /// Best-effort reverse mapping used when describing the sink's existing
    /// columns back into source-equivalent classes (§4.2 `describe`).
    pub fn from_sink_type(sink_type: &str) -> FieldClass {
        match sink_type.to_ascii_uppercase().as_str() {
            "BIGINT" | "INTEGER" | "INT" | "INT4" | "INT8" | "SMALLINT" => FieldClass::Int,
            "DOUBLE PRECISION" | "REAL" | "FLOAT4" | "FLOAT8" => FieldClass::Float,
            "BOOLEAN" | "BOOL" => FieldClass::Bool,
            "DATE" => FieldClass::Date,
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => FieldClass::DateTime,
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => FieldClass::Timestamp,
            "NUMERIC" | "DECIMAL" => FieldClass::Numeric,
            _ => FieldClass::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub class: FieldClass,
    pub nullable: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, class: FieldClass, nullable: bool) -> Self {
        Self {
            name: name.into(),
            class,
            nullable,
        }
    }
}

/// Ordered schema snapshot, immutable within a run after batch 1 (invariant I1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    pub fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
