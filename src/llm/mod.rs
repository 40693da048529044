//! Prompt assembly, language model gateway and statement extraction.

pub mod gateway;
pub mod parser;
pub mod prompt;

pub use gateway::{HttpGateway, LanguageModelGateway, LlmProvider};
pub use parser::{ExtractedStatement, ExtractionConfidence, ResponseParser};
pub use prompt::{PromptBuilder, PromptRequest, PromptTemplate, SqlDialect};
