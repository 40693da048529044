//! Statement execution against the target database.

use crate::database::DatabaseTarget;
use crate::otel::{db_query_span, record_db_metrics};
use crate::types::{AskError, CellValue, Result, ResultEnvelope, Row};
use rusqlite::Connection;

/// Rows and metadata of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    /// Column names from the statement's result metadata
    pub columns: Vec<String>,

    /// All rows, eagerly read
    pub rows: Vec<Row>,

    /// Changed rows for write statements
    pub rows_affected: Option<u64>,
}

/// Executes one statement per call and normalizes the outcome.
pub struct QueryExecutor {
    target: DatabaseTarget,
}

impl QueryExecutor {
    /// Create an executor for a database target.
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    /// Database target in use.
    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Run a statement on a fresh connection.
    ///
    /// The connection is released before this returns, whatever the outcome.
    /// The attempted statement is always echoed in the envelope.
    pub fn execute(&self, statement: &str) -> ResultEnvelope {
        let namespace = self.target.path().display().to_string();
        let span = db_query_span(statement, Some(namespace.as_str()));
        let _guard = span.enter();

        let outcome = self.target.connect().and_then(|conn| {
            let outcome = run_statement(&conn, statement);
            conn.close();
            outcome
        });

        into_envelope(statement, outcome)
    }

    /// Run a statement on a caller-owned connection.
    pub fn execute_on(conn: &Connection, statement: &str) -> ResultEnvelope {
        let span = db_query_span(statement, None);
        let _guard = span.enter();

        into_envelope(statement, run_statement(conn, statement))
    }
}

fn into_envelope(statement: &str, outcome: Result<Materialized>) -> ResultEnvelope {
    match outcome {
        Ok(m) => {
            record_db_metrics(Some(m.rows.len()), m.rows_affected);
            tracing::info!(
                rows = m.rows.len(),
                columns = m.columns.len(),
                "statement executed"
            );
            ResultEnvelope::success(statement, m.columns, m.rows, m.rows_affected)
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind().as_str(), "statement failed");
            ResultEnvelope::failure(Some(statement.to_string()), &e)
        }
    }
}

/// Prepare, run and fully materialize exactly one statement.
///
/// Only the first statement of `sql` is compiled; trailing text is ignored.
/// `rows_affected` is set for statements that may write, and is zero when
/// no row changed (DDL included).
///
/// # Errors
///
/// Returns `AskError::ExecutionError` with the engine's message if the
/// statement is rejected or fails while stepping, or `AskError::DatabaseBusy`
/// if the database stayed locked past the busy timeout
pub fn run_statement(conn: &Connection, sql: &str) -> Result<Materialized> {
    if sql.trim().is_empty() {
        return Err(AskError::ExecutionError("empty statement".to_string()));
    }

    let mut stmt = conn.prepare(sql).map_err(AskError::execution)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let writes = !stmt.readonly();
    let before = if writes {
        total_changes(conn).map_err(AskError::execution)?
    } else {
        0
    };

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(AskError::execution)?;
    while let Some(row) = cursor.next().map_err(AskError::execution)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(CellValue::from(row.get_ref(i).map_err(AskError::execution)?));
        }
        rows.push(values);
    }
    drop(cursor);

    let rows_affected = if writes {
        let changed = total_changes(conn).map_err(AskError::execution)? > before;
        Some(if changed { conn.changes() as u64 } else { 0 })
    } else {
        None
    };

    Ok(Materialized {
        columns,
        rows,
        rows_affected,
    })
}

/// Rows changed on this connection since it was opened.
fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
}
