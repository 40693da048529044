//! Language model gateway.
//!
//! The pipeline only depends on [`LanguageModelGateway`]: prompt in, free
//! text out. [`HttpGateway`] talks to hosted or local chat APIs.

use crate::llm::prompt::PromptRequest;
use crate::otel::llm_span;
use crate::types::{AskError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::Instrument;

/// Request/response contract with a language model service.
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Send the prompt and return the model's raw reply.
    ///
    /// # Errors
    ///
    /// Returns `AskError::GatewayError` or `AskError::GatewayTimeout`
    async fn complete(&self, request: &PromptRequest) -> Result<String>;

    /// Short description for logs, e.g. `ollama/deepseek-r1:8b`.
    fn describe(&self) -> String;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    /// Infer the provider from a model name.
    pub fn from_model(model: &str) -> Self {
        let model = model.to_ascii_lowercase();
        if model.starts_with("claude") || model.starts_with("anthropic") {
            Self::Anthropic
        } else if ["gpt", "o1", "o3", "o4", "chatgpt"]
            .iter()
            .any(|prefix| model.starts_with(prefix))
        {
            Self::OpenAI
        } else {
            Self::Ollama
        }
    }

    /// Default chat endpoint.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::Ollama => "http://localhost:11434/api/chat",
        }
    }

    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Name used in logs and spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = AskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(AskError::config(format!("unknown LLM provider '{}'", other))),
        }
    }
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Anthropic messages response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Ollama chat response (non-streaming).
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: ChatMessage,
}

/// Chat API client for OpenAI, Anthropic and Ollama.
pub struct HttpGateway {
    provider: LlmProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    temperature: f32,
    timeout: Duration,
    client: Client,
}

impl HttpGateway {
    /// Create a gateway.
    ///
    /// # Arguments
    ///
    /// * `provider` - API flavour
    /// * `model` - Model name (e.g. "deepseek-r1:8b", "gpt-4.1", "claude-sonnet-4-5")
    /// * `endpoint` - Override for the provider's default URL
    /// * `api_key` - Required for hosted providers
    /// * `timeout` - HTTP client timeout
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if a hosted provider has no key or the client cannot be built
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if provider.requires_api_key() && api_key.as_deref().map_or(true, str::is_empty) {
            return Err(AskError::config(format!("{} requires an API key", provider)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AskError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            model: model.into(),
            endpoint: endpoint.unwrap_or_else(|| provider.default_endpoint().to_string()),
            api_key,
            temperature: 0.0,
            timeout,
            client,
        })
    }

    /// Sampling temperature (default 0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Provider in use.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Endpoint URL in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// JSON body for the provider's chat API.
    fn request_body(&self, request: &PromptRequest) -> serde_json::Value {
        let user = request.user_message();
        match self.provider {
            LlmProvider::OpenAI => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": request.instructions},
                    {"role": "user", "content": user}
                ],
                "temperature": self.temperature
            }),
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "max_tokens": 4096,
                "system": request.instructions,
                "messages": [
                    {"role": "user", "content": user}
                ],
                "temperature": self.temperature
            }),
            LlmProvider::Ollama => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": request.instructions},
                    {"role": "user", "content": user}
                ],
                "stream": false,
                "options": {"temperature": self.temperature}
            }),
        }
    }

    /// Pull the reply text out of a provider response body.
    fn reply_text(&self, body: &str) -> Result<String> {
        let malformed =
            |e: serde_json::Error| AskError::gateway(format!("malformed {} reply: {}", self.provider, e));

        match self.provider {
            LlmProvider::OpenAI => {
                let parsed: OpenAIResponse = serde_json::from_str(body).map_err(malformed)?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| AskError::gateway("no response from OpenAI"))
            }
            LlmProvider::Anthropic => {
                let parsed: AnthropicResponse = serde_json::from_str(body).map_err(malformed)?;
                let text: String = parsed
                    .content
                    .into_iter()
                    .filter(|c| c.kind == "text")
                    .map(|c| c.text)
                    .collect();
                if text.is_empty() {
                    return Err(AskError::gateway("no response from Anthropic"));
                }
                Ok(text)
            }
            LlmProvider::Ollama => {
                let parsed: OllamaResponse = serde_json::from_str(body).map_err(malformed)?;
                parsed
                    .message
                    .content
                    .ok_or_else(|| AskError::gateway("no response from Ollama"))
            }
        }
    }

    async fn post(&self, body: serde_json::Value) -> Result<String> {
        let mut builder = self.client.post(&self.endpoint).json(&body);
        builder = match (self.provider, self.api_key.as_deref()) {
            (LlmProvider::Anthropic, Some(key)) => builder
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01"),
            (_, Some(key)) if !key.is_empty() => builder.bearer_auth(key),
            _ => builder,
        };

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(AskError::gateway(format!(
                "{} API error {}: {}",
                self.provider, status, text
            )));
        }

        Ok(text)
    }

    fn transport_error(&self, e: reqwest::Error) -> AskError {
        if e.is_timeout() {
            AskError::GatewayTimeout(self.timeout)
        } else {
            AskError::gateway(format!("{} API error: {}", self.provider, e))
        }
    }
}

#[async_trait]
impl LanguageModelGateway for HttpGateway {
    async fn complete(&self, request: &PromptRequest) -> Result<String> {
        let span = llm_span(self.provider.as_str(), &self.model);
        async {
            let body = self.post(self.request_body(request)).await?;
            let reply = self.reply_text(&body)?;
            tracing::Span::current().record("gen_ai.response.length", reply.len());
            tracing::debug!(reply = %reply, "model reply received");
            Ok(reply)
        }
        .instrument(span)
        .await
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::PromptBuilder;
    use crate::schema::Schema;

    fn gateway(provider: LlmProvider) -> HttpGateway {
        HttpGateway::new(
            provider,
            "test-model",
            None,
            Some("sk-test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> PromptRequest {
        let schema = Schema::new().with_table("customers", ["customer_id", "name"]);
        PromptBuilder::default().build(&schema, "list names").unwrap()
    }

    #[test]
    fn test_provider_from_model() {
        assert_eq!(LlmProvider::from_model("claude-sonnet-4-5"), LlmProvider::Anthropic);
        assert_eq!(LlmProvider::from_model("gpt-4.1"), LlmProvider::OpenAI);
        assert_eq!(LlmProvider::from_model("o3-mini"), LlmProvider::OpenAI);
        assert_eq!(LlmProvider::from_model("deepseek-r1:8b"), LlmProvider::Ollama);
        assert_eq!(LlmProvider::from_model("llama3.1"), LlmProvider::Ollama);
    }

    #[test]
    fn test_hosted_provider_requires_key() {
        let result = HttpGateway::new(
            LlmProvider::OpenAI,
            "gpt-4.1",
            None,
            None,
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(AskError::ConfigError(_))));

        let local = HttpGateway::new(
            LlmProvider::Ollama,
            "deepseek-r1:8b",
            None,
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(local.endpoint(), "http://localhost:11434/api/chat");
        assert_eq!(local.describe(), "ollama/deepseek-r1:8b");
    }

    #[test]
    fn test_request_bodies_carry_instructions_and_schema() {
        let req = request();

        let openai = gateway(LlmProvider::OpenAI).request_body(&req);
        assert_eq!(openai["messages"][0]["role"], "system");
        assert_eq!(openai["messages"][0]["content"], req.instructions.as_str());
        assert_eq!(openai["messages"][1]["content"], req.user_message().as_str());

        let anthropic = gateway(LlmProvider::Anthropic).request_body(&req);
        assert_eq!(anthropic["system"], req.instructions.as_str());
        assert_eq!(anthropic["messages"].as_array().unwrap().len(), 1);

        let ollama = gateway(LlmProvider::Ollama).request_body(&req);
        assert_eq!(ollama["stream"], false);
        assert_eq!(ollama["options"]["temperature"], 0.0);
    }

    #[test]
    fn test_reply_text_per_provider() {
        let openai = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1;"}}]}"#;
        assert_eq!(gateway(LlmProvider::OpenAI).reply_text(openai).unwrap(), "SELECT 1;");

        let anthropic = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"SELECT 2;"}]}"#;
        assert_eq!(
            gateway(LlmProvider::Anthropic).reply_text(anthropic).unwrap(),
            "SELECT 2;"
        );

        let ollama = r#"{"model":"deepseek-r1:8b","message":{"role":"assistant","content":"<think>x</think>SELECT 3;"},"done":true}"#;
        assert_eq!(
            gateway(LlmProvider::Ollama).reply_text(ollama).unwrap(),
            "<think>x</think>SELECT 3;"
        );
    }

    #[test]
    fn test_reply_text_errors() {
        let err = gateway(LlmProvider::OpenAI)
            .reply_text(r#"{"choices":[]}"#)
            .unwrap_err();
        assert!(matches!(err, AskError::GatewayError(_)));

        let err = gateway(LlmProvider::Ollama).reply_text("not json").unwrap_err();
        assert!(err.to_string().contains("malformed ollama reply"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_gateway_error() {
        let gw = HttpGateway::new(
            LlmProvider::Ollama,
            "deepseek-r1:8b",
            Some("http://127.0.0.1:9/api/chat".to_string()),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = gw.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AskError::GatewayError(_)));
    }
}
