//! Result type alias for askdb operations.

use super::error::AskError;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AskError>;
