//! Tracing instrumentation for askdb.
//!
//! Spans follow OpenTelemetry semantic conventions so they can be exported
//! unchanged by any `tracing` subscriber that speaks OTLP:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//! - https://opentelemetry.io/docs/specs/semconv/gen-ai/gen-ai-spans/
//!
//! # Database Semantic Conventions
//!
//! **Span naming**: `{db.operation.name} {target}`
//! - Example: `introspect`, `execute customers`
//!
//! **Attributes**:
//! - `db.system.name`: Always `"sqlite"`
//! - `db.namespace`: Database file path
//! - `db.operation.name`: `introspect` or `execute`
//! - `db.query.text`: The extracted statement
//!
//! # Language Model Conventions
//!
//! - `gen_ai.system`: Provider name (`openai`, `anthropic`, `ollama`)
//! - `gen_ai.request.model`: Model name
//!
//! # Example
//!
//! ```rust,ignore
//! use askdb::otel::{db_span, DbOperation};
//!
//! let span = db_span(DbOperation::Introspect, None, Some("shop.sqlite"));
//! let _guard = span.enter();
//! ```

pub mod db;
pub mod init;
pub mod llm;

pub use db::{db_query_span, db_span, record_db_metrics, DbOperation};
pub use init::{init_tracing, LogFormat};
pub use llm::llm_span;
