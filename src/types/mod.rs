//! Core data types for askdb.
//!
//! - `ResultEnvelope`: terminal value of one question/answer cycle
//! - `CellValue`: a single materialized column value
//! - `AskError`: error taxonomy for every pipeline stage
//! - `Result`: convenient result type alias

pub mod envelope;
pub mod error;
pub mod result;

pub use envelope::{CellValue, ResultEnvelope, Row};
pub use error::{AskError, ErrorKind};
pub use result::Result;
