//! Reads table and column metadata from a SQLite database.

use crate::database::DatabaseTarget;
use crate::otel::{db_span, record_db_metrics, DbOperation};
use crate::schema::Schema;
use crate::types::{AskError, Result};
use rusqlite::Connection;

const LIST_TABLES: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const LIST_COLUMNS: &str = "SELECT name FROM pragma_table_info(?1) ORDER BY cid";

/// Enumerates every table visible to a connection.
pub struct SchemaIntrospector {
    target: DatabaseTarget,
}

impl SchemaIntrospector {
    /// Create an introspector for a database target.
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    /// Open a scoped connection and read the schema.
    ///
    /// Not retried: a failure surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConnectionError` if the database cannot be opened or read
    pub fn introspect(&self) -> Result<Schema> {
        let namespace = self.target.path().display().to_string();
        let span = db_span(DbOperation::Introspect, None, Some(namespace.as_str()));
        let _guard = span.enter();

        let conn = self.target.connect()?;
        let schema = read_schema(&conn);
        conn.close();

        let schema = schema?;
        record_db_metrics(Some(schema.len()), None);
        tracing::debug!(tables = schema.len(), "schema introspected");
        Ok(schema)
    }
}

/// Read the schema through a caller-owned connection.
///
/// # Errors
///
/// Returns `AskError::ConnectionError` if the catalog cannot be queried
pub fn read_schema(conn: &Connection) -> Result<Schema> {
    let unreadable = |e: rusqlite::Error| AskError::connection(format!("schema unreadable: {}", e));

    let tables: Vec<String> = {
        let mut stmt = conn.prepare(LIST_TABLES).map_err(unreadable)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(unreadable)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(unreadable)?;
        names
    };

    let mut schema = Schema::new();
    let mut stmt = conn.prepare(LIST_COLUMNS).map_err(unreadable)?;
    for table in tables {
        let columns = stmt
            .query_map([&table], |row| row.get(0))
            .map_err(unreadable)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(unreadable)?;
        schema.insert_table(table, columns);
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_introspect_lists_tables_and_columns_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shop.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (customer_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, city TEXT);
             CREATE TABLE orders (order_id INTEGER PRIMARY KEY, customer_id INTEGER, status TEXT);
             CREATE VIEW big_orders AS SELECT * FROM orders;",
        )
        .unwrap();
        drop(conn);

        let target = DatabaseTarget::new(&path);
        let schema = SchemaIntrospector::new(target.clone()).introspect().unwrap();

        // sqlite_sequence (from AUTOINCREMENT) and views are not listed
        assert_eq!(schema.table_names().collect::<Vec<_>>(), ["customers", "orders"]);
        assert_eq!(
            schema.columns("customers").unwrap(),
            ["customer_id", "name", "city"]
        );
        assert_eq!(target.stats().live(), 0);
    }

    #[test]
    fn test_introspect_missing_database_fails() {
        let dir = tempdir().unwrap();
        let target = DatabaseTarget::new(dir.path().join("nope.sqlite"));
        let err = SchemaIntrospector::new(target).introspect().unwrap_err();
        assert!(matches!(err, AskError::ConnectionError(_)));
    }

    #[test]
    fn test_read_schema_reflects_current_state() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(read_schema(&conn).unwrap().is_empty());

        conn.execute_batch("CREATE TABLE products (product_id INTEGER, price REAL);")
            .unwrap();
        let schema = read_schema(&conn).unwrap();
        assert_eq!(schema.columns("products").unwrap(), ["product_id", "price"]);
    }
}
