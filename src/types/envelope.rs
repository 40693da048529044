//! Result envelope returned for every question.

use crate::types::error::{AskError, ErrorKind};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single materialized column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(n) => Self::Integer(n),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl From<SqlValue> for CellValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(n) => Self::Integer(n),
            SqlValue::Real(f) => Self::Real(f),
            SqlValue::Text(t) => Self::Text(t),
            SqlValue::Blob(b) => Self::Blob(b),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Real(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "[BLOB {} bytes]", b.len()),
        }
    }
}

/// One result row, in column order.
pub type Row = Vec<CellValue>;

/// Terminal value of one question/answer cycle.
///
/// Exactly one of (`rows` + `columns`) or `error` is populated. `query` is set
/// whenever a statement was extracted, independent of execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the statement executed successfully
    pub success: bool,

    /// Result rows (success only; empty for statements without a result set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,

    /// Column names from the statement's result metadata (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Rows changed by a write statement (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,

    /// The extracted statement, if any
    pub query: Option<String>,

    /// Human-readable diagnostic (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure classification (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Resubmitting the same question could plausibly succeed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub transient: bool,
}

impl ResultEnvelope {
    /// Successful execution.
    pub fn success(
        query: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Row>,
        rows_affected: Option<u64>,
    ) -> Self {
        Self {
            success: true,
            rows: Some(rows),
            columns: Some(columns),
            rows_affected,
            query: Some(query.into()),
            error: None,
            error_kind: None,
            transient: false,
        }
    }

    /// Failed request, with the statement that was attempted (if any).
    pub fn failure(query: Option<String>, error: &AskError) -> Self {
        Self {
            success: false,
            rows: None,
            columns: None,
            rows_affected: None,
            query,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            transient: error.is_transient(),
        }
    }

    /// Number of rows returned (0 for failures).
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// Rows, or an empty slice for failures.
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or(&[])
    }

    /// Column names, or an empty slice for failures.
    pub fn columns(&self) -> &[String] {
        self.columns.as_deref().unwrap_or(&[])
    }
}
