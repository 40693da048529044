//! Statement execution.

pub mod executor;

pub use executor::{run_statement, Materialized, QueryExecutor};
