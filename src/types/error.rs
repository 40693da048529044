//! Error types for the question-to-result pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for every stage of a request.
///
/// Every variant is recovered at the pipeline boundary and converted into a
/// failed [`ResultEnvelope`](crate::types::ResultEnvelope); none reach the caller as a fault.
#[derive(Error, Debug)]
pub enum AskError {
    /// Database could not be opened or its schema could not be read
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Language model service unreachable or returned an unusable reply
    #[error("Language model request failed: {0}")]
    GatewayError(String),

    /// Language model did not answer within the configured bound
    #[error("Language model did not respond within {}s", .0.as_secs_f64())]
    GatewayTimeout(Duration),

    /// No bounded SQL statement could be found in the model reply
    #[error("Could not extract a SQL statement from the model reply: {0}")]
    ExtractionAmbiguity(String),

    /// Database rejected the statement (engine text kept verbatim)
    #[error("{0}")]
    ExecutionError(String),

    /// Database was locked by another connection past the busy timeout
    #[error("{0}")]
    DatabaseBusy(String),

    /// Question was empty or unusable
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Export operation failed
    #[error("Export failed: {0}")]
    ExportError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// HTTP client error (for language model APIs)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// SQLite error outside of statement execution
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Stable, machine-readable label for an [`AskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Gateway,
    GatewayTimeout,
    ExtractionAmbiguity,
    Execution,
    InvalidQuestion,
    Config,
    Export,
    Internal,
}

impl ErrorKind {
    /// Label as used in logs and envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Gateway => "gateway",
            Self::GatewayTimeout => "gateway_timeout",
            Self::ExtractionAmbiguity => "extraction_ambiguity",
            Self::Execution => "execution",
            Self::InvalidQuestion => "invalid_question",
            Self::Config => "config",
            Self::Export => "export",
            Self::Internal => "internal",
        }
    }
}

impl AskError {
    /// Create a connection error with context.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a gateway error with context.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::GatewayError(msg.into())
    }

    /// Create a config error with context.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Engine error from running a statement, message kept verbatim.
    ///
    /// Busy and locked failures become `DatabaseBusy` so they stay retryable.
    pub fn execution(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            Self::DatabaseBusy(e.to_string())
        } else {
            Self::ExecutionError(e.to_string())
        }
    }

    /// Classify the error into its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionError(_) => ErrorKind::Connection,
            Self::GatewayError(_) | Self::HttpError(_) => ErrorKind::Gateway,
            Self::GatewayTimeout(_) => ErrorKind::GatewayTimeout,
            Self::ExtractionAmbiguity(_) => ErrorKind::ExtractionAmbiguity,
            Self::ExecutionError(_) | Self::DatabaseBusy(_) | Self::SqliteError(_) => {
                ErrorKind::Execution
            }
            Self::InvalidQuestion(_) => ErrorKind::InvalidQuestion,
            Self::ConfigError(_) | Self::YamlError(_) => ErrorKind::Config,
            Self::ExportError(_) => ErrorKind::Export,
            Self::IoError(_) | Self::JsonError(_) | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Check if resubmitting the same question could plausibly succeed.
    ///
    /// Nothing in the crate retries on its own; this only informs the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::GatewayTimeout(_) | Self::DatabaseBusy(_) => true,
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            Self::SqliteError(e) => is_busy(e),
            _ => false,
        }
    }
}

/// SQLITE_BUSY or SQLITE_LOCKED.
pub(crate) fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if matches!(f.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AskError::connection("unable to open database file");
        assert_eq!(
            err.to_string(),
            "Database connection failed: unable to open database file"
        );

        let err = AskError::ExecutionError("no such column: nme".to_string());
        assert_eq!(err.to_string(), "no such column: nme");

        let err = AskError::GatewayTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Language model did not respond within 30s");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AskError::gateway("boom").kind(), ErrorKind::Gateway);
        assert_eq!(
            AskError::ExtractionAmbiguity("prose".into()).kind().as_str(),
            "extraction_ambiguity"
        );
        let io = AskError::from(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert_eq!(io.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_transient_classification() {
        assert!(AskError::GatewayTimeout(Duration::from_secs(1)).is_transient());
        assert!(!AskError::ExecutionError("syntax error".into()).is_transient());
        assert!(!AskError::config("missing key").is_transient());
        assert!(AskError::DatabaseBusy("database is locked".into()).is_transient());
    }

    #[test]
    fn test_execution_keeps_busy_code() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        let err = AskError::execution(busy);
        assert!(matches!(err, AskError::DatabaseBusy(_)));
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.to_string(), "database is locked");
        assert!(err.is_transient());

        let syntax = AskError::execution(rusqlite::Error::InvalidQuery);
        assert!(matches!(syntax, AskError::ExecutionError(_)));
        assert!(!syntax.is_transient());
    }
}
