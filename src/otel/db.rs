//! Database operation instrumentation.
//!
//! Implements OpenTelemetry semantic conventions for SQLite operations.

use tracing::{field, span, Level, Span};

/// Database operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy)]
pub enum DbOperation {
    /// Read table/column catalog
    Introspect,
    /// Execute one extracted statement
    Execute,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introspect => "introspect",
            Self::Execute => "execute",
        }
    }
}

/// Create database operation span with semantic conventions.
///
/// # Arguments
///
/// * `operation` - Database operation type
/// * `collection` - Table name (optional)
/// * `namespace` - Database path (optional)
///
/// # Returns
///
/// Tracing span with OpenTelemetry semantic attributes
pub fn db_span(operation: DbOperation, collection: Option<&str>, namespace: Option<&str>) -> Span {
    // Span name: "{operation} {collection}" or just "{operation}"
    let span_name = match collection {
        Some(coll) => format!("{} {}", operation.as_str(), coll),
        None => operation.as_str().to_string(),
    };

    let span = span!(
        Level::INFO,
        "db",
        otel.name = %span_name,
        otel.kind = "client",
        db.system.name = "sqlite",
        db.operation.name = operation.as_str(),
        db.collection.name = field::Empty,
        db.namespace = field::Empty,
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    );

    if let Some(coll) = collection {
        span.record("db.collection.name", coll);
    }
    if let Some(ns) = namespace {
        span.record("db.namespace", ns);
    }

    span
}

/// Create database query span carrying the statement text.
///
/// # Arguments
///
/// * `query_text` - Statement about to run
/// * `namespace` - Database path (optional)
pub fn db_query_span(query_text: &str, namespace: Option<&str>) -> Span {
    let span = span!(
        Level::INFO,
        "db.query",
        otel.name = "execute",
        otel.kind = "client",
        db.system.name = "sqlite",
        db.operation.name = DbOperation::Execute.as_str(),
        db.query.text = query_text,
        db.namespace = field::Empty,
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    );

    if let Some(ns) = namespace {
        span.record("db.namespace", ns);
    }

    span
}

/// Record database operation metrics in the current span.
///
/// # Arguments
///
/// * `rows_returned` - Number of rows (or tables) returned (optional)
/// * `rows_affected` - Number of rows modified (optional)
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<u64>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}
