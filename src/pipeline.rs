//! Question in, result envelope out.
//!
//! `introspect -> build prompt -> model -> extract -> execute`, strictly in
//! order. Every failure becomes a failed [`ResultEnvelope`]; `ask` never errors.

use crate::config::Config;
use crate::database::DatabaseTarget;
use crate::llm::{
    ExtractedStatement, LanguageModelGateway, PromptBuilder, PromptRequest, ResponseParser,
};
use crate::query::QueryExecutor;
use crate::schema::{Schema, SchemaIntrospector};
use crate::types::{AskError, Result, ResultEnvelope};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline behaviour switches.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Bounded wait for the model reply
    pub gateway_timeout: Duration,

    /// Refuse to execute low-confidence extractions
    pub strict_extraction: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(120),
            strict_extraction: true,
        }
    }
}

/// Orchestrates one question/answer cycle per call.
///
/// Holds no per-request state, so concurrent `ask` calls are independent;
/// each opens and releases its own connections.
pub struct Pipeline {
    target: DatabaseTarget,
    builder: PromptBuilder,
    gateway: Arc<dyn LanguageModelGateway>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        target: DatabaseTarget,
        builder: PromptBuilder,
        gateway: Arc<dyn LanguageModelGateway>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            target,
            builder,
            gateway,
            options,
        }
    }

    /// Build the pipeline described by a configuration.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.database_target(),
            config.prompt_builder()?,
            Arc::new(config.gateway()?),
            PipelineOptions {
                gateway_timeout: config.gateway_timeout(),
                strict_extraction: config.strict_extraction,
            },
        ))
    }

    /// Database target in use.
    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Answer a question. Never fails; failures are in the envelope.
    pub async fn ask(&self, question: &str) -> ResultEnvelope {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "ask",
            request.id = %request_id,
            gateway = %self.gateway.describe(),
        );

        async {
            let started = Instant::now();
            let envelope = match self.run(question).await {
                Ok(envelope) => envelope,
                Err((query, e)) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), "request failed");
                    ResultEnvelope::failure(query, &e)
                }
            };
            tracing::info!(
                success = envelope.success,
                rows = envelope.row_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request finished"
            );
            envelope
        }
        .instrument(span)
        .await
    }

    /// Read the schema and assemble the prompt, without calling the model.
    ///
    /// # Errors
    ///
    /// Returns `AskError::InvalidQuestion` or `AskError::ConnectionError`
    pub async fn prepare(&self, question: &str) -> Result<PromptRequest> {
        if question.trim().is_empty() {
            return Err(AskError::InvalidQuestion("question is empty".to_string()));
        }
        let schema = self.introspect().await?;
        self.builder.build(&schema, question)
    }

    /// Fresh schema for the target database.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConnectionError` if the database cannot be read
    pub async fn introspect(&self) -> Result<Schema> {
        let introspector = SchemaIntrospector::new(self.target.clone());
        blocking(move || introspector.introspect()).await
    }

    /// Ask the model and extract a statement.
    ///
    /// # Errors
    ///
    /// Returns `AskError::GatewayError` or `AskError::GatewayTimeout`
    pub async fn generate(&self, request: &PromptRequest) -> Result<ExtractedStatement> {
        let bound = self.options.gateway_timeout;
        let reply = tokio::time::timeout(bound, self.gateway.complete(request))
            .await
            .map_err(|_| AskError::GatewayTimeout(bound))??;

        let extracted = ResponseParser::parse(&reply);
        tracing::debug!(
            confidence = ?extracted.confidence(),
            sql = extracted.sql(),
            "statement extracted"
        );
        Ok(extracted)
    }

    async fn run(&self, question: &str) -> std::result::Result<ResultEnvelope, (Option<String>, AskError)> {
        let request = self.prepare(question).await.map_err(|e| (None, e))?;
        let extracted = self.generate(&request).await.map_err(|e| (None, e))?;

        if !extracted.is_bounded() {
            let text = extracted.into_sql();
            if text.is_empty() {
                return Err((None, AskError::ExtractionAmbiguity(summarize(&text))));
            }
            if self.options.strict_extraction {
                // Echoed in the envelope, never executed.
                let error = AskError::ExtractionAmbiguity(summarize(&text));
                return Err((Some(text), error));
            }
            tracing::warn!(text = %text, "executing low-confidence extraction");
            return Ok(self.execute(text).await);
        }

        Ok(self.execute(extracted.into_sql()).await)
    }

    async fn execute(&self, statement: String) -> ResultEnvelope {
        let executor = QueryExecutor::new(self.target.clone());
        let attempted = statement.clone();
        let span = tracing::Span::current();
        let task = tokio::task::spawn_blocking(move || span.in_scope(|| executor.execute(&statement)));
        match task.await {
            Ok(envelope) => envelope,
            Err(e) => ResultEnvelope::failure(
                Some(attempted),
                &AskError::InternalError(format!("execution task failed: {}", e)),
            ),
        }
    }
}

/// Run blocking database work off the async executor, inside the caller's span.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| AskError::InternalError(format!("blocking task failed: {}", e)))?
}

/// First line of the model's reply, shortened for the error message.
fn summarize(text: &str) -> String {
    const MAX: usize = 120;
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.is_empty() {
        return "model reply was empty".to_string();
    }
    if line.chars().count() > MAX {
        let short: String = line.chars().take(MAX).collect();
        format!("model replied \"{}...\"", short)
    } else {
        format!("model replied \"{}\"", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(""), "model reply was empty");
        assert_eq!(
            summarize("\n I cannot answer that.\nSorry."),
            "model replied \"I cannot answer that.\""
        );
        let long = "x".repeat(300);
        assert!(summarize(&long).ends_with("...\""));
    }
}
