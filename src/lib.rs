//! askdb - ask a relational database questions in natural language
//!
//! Translation-and-execution pipeline:
//! - Introspect the live schema (fresh on every request)
//! - Build a schema-constrained, dialect-specific prompt
//! - Call a language model (OpenAI, Anthropic or a local Ollama)
//! - Extract exactly one statement from the free-text reply
//! - Execute it and return a structured [`ResultEnvelope`]
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> askdb::Result<()> {
//! let config = askdb::Config::from_env()?;
//! let pipeline = askdb::Pipeline::from_config(&config)?;
//!
//! let envelope = pipeline.ask("list all customer names").await;
//! if envelope.success {
//!     println!("{} rows", envelope.row_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod export;
pub mod llm;
pub mod otel;
pub mod pipeline;
pub mod query;
pub mod sample;
pub mod schema;
pub mod types;

pub use config::Config;
pub use database::{ConnectionStats, DatabaseTarget};
pub use llm::{
    ExtractedStatement, ExtractionConfidence, HttpGateway, LanguageModelGateway, LlmProvider,
    PromptBuilder, PromptRequest, PromptTemplate, ResponseParser, SqlDialect,
};
pub use pipeline::{Pipeline, PipelineOptions};
pub use query::QueryExecutor;
pub use schema::{Schema, SchemaIntrospector};
pub use types::{AskError, CellValue, ErrorKind, Result, ResultEnvelope};
