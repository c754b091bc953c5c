use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered name -> value mapping, typed by the schema snapshot captured at
/// batch 1 (design notes §9: "dynamically shaped row mappings ... represent as
/// ordered name->value maps").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Projects a subset of columns, in the order requested, defaulting missing
    /// columns to `Value::Null`. Used to build upsert-key tuples.
    pub fn project(&self, columns: &[String]) -> Vec<Value> {
        columns
            .iter()
            .map(|c| self.get(c).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Row(IndexMap::from_iter(iter))
    }
}
