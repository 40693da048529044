//! Sample store database for trying the pipeline.
//!
//! Four tables (`customers`, `products`, `orders`, `order_items`) with a
//! small deterministic data set. Seeding is idempotent.

use crate::types::{AskError, Result};
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS customers (
    customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    email TEXT,
    city TEXT,
    join_date TEXT
);
CREATE TABLE IF NOT EXISTS products (
    product_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    price REAL,
    stock INTEGER,
    category TEXT
);
CREATE TABLE IF NOT EXISTS orders (
    order_id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER,
    order_date TEXT,
    status TEXT,
    total_amount REAL,
    FOREIGN KEY(customer_id) REFERENCES customers(customer_id)
);
CREATE TABLE IF NOT EXISTS order_items (
    order_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER,
    product_id INTEGER,
    quantity INTEGER,
    price REAL,
    FOREIGN KEY(order_id) REFERENCES orders(order_id),
    FOREIGN KEY(product_id) REFERENCES products(product_id)
);
";

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Amara Okafor", "Lagos", "2023-01-14"),
    ("Bruno Costa", "Lisbon", "2023-02-03"),
    ("Chen Wei", "Shanghai", "2023-02-21"),
    ("Dana Kowalski", "Warsaw", "2023-03-09"),
    ("Elif Demir", "Istanbul", "2023-04-17"),
    ("Farid Haddad", "Beirut", "2023-05-30"),
    ("Greta Lindqvist", "Stockholm", "2023-06-12"),
    ("Hiro Tanaka", "Osaka", "2023-07-01"),
    ("Isabel Ruiz", "Madrid", "2023-08-22"),
    ("Jonas Weber", "Berlin", "2023-09-05"),
    ("Kavya Nair", "Chennai", "2023-10-18"),
    ("Liam Murphy", "Dublin", "2023-11-27"),
];

const PRODUCTS: &[(&str, f64, i64, &str)] = &[
    ("Mechanical Keyboard", 89.99, 120, "electronics"),
    ("Wireless Mouse", 24.5, 200, "electronics"),
    ("27in Monitor", 279.0, 45, "electronics"),
    ("Standing Desk", 449.0, 15, "furniture"),
    ("Ergonomic Chair", 319.99, 22, "furniture"),
    ("Desk Lamp", 34.75, 80, "furniture"),
    ("Notebook Pack", 12.0, 150, "stationery"),
    ("Fountain Pen", 58.25, 60, "stationery"),
    ("Coffee Grinder", 74.9, 35, "kitchen"),
    ("French Press", 29.99, 90, "kitchen"),
];

const STATUSES: &[&str] = &["Pending", "Shipped", "Delivered"];

const ORDER_COUNT: i64 = 30;

/// Create the sample schema and data in a database file (created if missing).
///
/// Returns `true` if rows were inserted, `false` if the data already existed.
///
/// # Errors
///
/// Returns `AskError::ConnectionError` if the file cannot be opened, or
/// `AskError::SqliteError` if a statement fails
pub fn seed(path: &Path) -> Result<bool> {
    let mut conn = Connection::open(path).map_err(|e| {
        AskError::connection(format!("cannot open {}: {}", path.display(), e))
    })?;
    seed_connection(&mut conn)
}

/// Seed through a caller-owned connection.
///
/// # Errors
///
/// Returns `AskError::SqliteError` if a statement fails
pub fn seed_connection(conn: &mut Connection) -> Result<bool> {
    conn.execute_batch(SCHEMA_SQL)?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))?;
    if existing > 0 {
        tracing::info!(customers = existing, "sample data already present");
        return Ok(false);
    }

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO customers (name, email, city, join_date) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (name, city, joined) in CUSTOMERS {
            let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
            insert.execute(params![name, email, city, joined])?;
        }

        let mut insert = tx.prepare(
            "INSERT INTO products (name, price, stock, category) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (name, price, stock, category) in PRODUCTS {
            insert.execute(params![name, price, stock, category])?;
        }

        let mut order = tx.prepare(
            "INSERT INTO orders (customer_id, order_date, status, total_amount) VALUES (?1, ?2, ?3, 0)",
        )?;
        let mut item = tx.prepare(
            "INSERT INTO order_items (order_id, product_id, quantity, price)
             SELECT ?1, product_id, ?3, price FROM products WHERE product_id = ?2",
        )?;
        let customers = CUSTOMERS.len() as i64;
        let products = PRODUCTS.len() as i64;

        for n in 0..ORDER_COUNT {
            let customer_id = (n * 7) % customers + 1;
            let date = format!("2024-{:02}-{:02}", n % 12 + 1, (n * 3) % 28 + 1);
            let status = STATUSES[(n as usize) % STATUSES.len()];
            order.execute(params![customer_id, date, status])?;
            let order_id = tx.last_insert_rowid();

            for k in 0..(n % 3 + 1) {
                let product_id = (n + k * 4) % products + 1;
                item.execute(params![order_id, product_id, k + 1])?;
            }
        }

        tx.execute(
            "UPDATE orders SET total_amount = (
                 SELECT ROUND(COALESCE(SUM(quantity * price), 0), 2)
                 FROM order_items WHERE order_items.order_id = orders.order_id
             )",
            [],
        )?;
    }
    tx.commit()?;

    tracing::info!(
        customers = CUSTOMERS.len(),
        products = PRODUCTS.len(),
        orders = ORDER_COUNT,
        "sample data inserted"
    );
    Ok(true)
}
