//! Live schema introspection.
//!
//! The schema is read fresh for every request and never cached.

pub mod introspect;

pub use introspect::SchemaIntrospector;

use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Table name to its column names, in the database's natural column order.
///
/// Tables are kept sorted so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    tables: BTreeMap<String, Vec<String>>,
}

impl Schema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table.
    pub fn insert_table(&mut self, name: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(name.into(), columns);
    }

    /// Builder-style variant of [`Schema::insert_table`].
    pub fn with_table<I, S>(mut self, name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_table(name, columns.into_iter().map(Into::into).collect());
        self
    }

    /// Columns of a table, if present.
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are visible.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Compact JSON used inside prompts, e.g. `{"customers":["customer_id","name"]}`.
    pub fn to_prompt_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.tables)?)
    }
}
