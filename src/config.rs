//! Pipeline configuration.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. Config file (JSON or YAML, from `--config` or `ASKDB_CONFIG`)
//! 3. `ASKDB_*` environment variables
//! 4. Provider API keys (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`) when no key is set

use crate::database::DatabaseTarget;
use crate::llm::{HttpGateway, LlmProvider, PromptBuilder, PromptTemplate, SqlDialect};
use crate::otel::LogFormat;
use crate::types::{AskError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name
    pub model: String,

    /// Explicit provider (inferred from the model name when absent)
    pub provider: Option<LlmProvider>,

    /// Endpoint override
    pub endpoint: Option<String>,

    /// API key (never written back out)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Bounded wait for one model reply, in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-r1:8b".to_string(),
            provider: None,
            endpoint: None,
            api_key: None,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Target dialect
    pub dialect: SqlDialect,

    /// Custom template file replacing the built-in one
    pub template_path: Option<PathBuf>,
}

/// Complete configuration, threaded explicitly into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file (`~` is expanded)
    pub database_path: PathBuf,

    /// Open the database read-only
    pub read_only: bool,

    /// Wait on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// Language model settings
    pub llm: LlmConfig,

    /// Prompt settings
    pub prompt: PromptConfig,

    /// Refuse to execute low-confidence extractions
    pub strict_extraction: bool,

    /// Console log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("askdb.sqlite"),
            read_only: false,
            busy_timeout_ms: 5000,
            llm: LlmConfig::default(),
            prompt: PromptConfig::default(),
            strict_extraction: true,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load a JSON or YAML file (by extension; `.yaml`/`.yml` are YAML).
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AskError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| AskError::config(format!("invalid config {}: {}", path.display(), e)))
        } else {
            serde_json::from_str(&content)
                .map_err(|e| AskError::config(format!("invalid config {}: {}", path.display(), e)))
        }
    }

    /// Defaults (or the file named by `ASKDB_CONFIG`) plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` for unreadable files or malformed values
    pub fn from_env() -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let mut config = match lookup("ASKDB_CONFIG") {
            Some(path) => Self::load(&expand(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply `ASKDB_*` overrides from an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if a value cannot be parsed
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ASKDB_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ASKDB_READ_ONLY") {
            self.read_only = parse_bool("ASKDB_READ_ONLY", &v)?;
        }
        if let Some(v) = lookup("ASKDB_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = parse_num("ASKDB_BUSY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ASKDB_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("ASKDB_LLM_PROVIDER") {
            self.llm.provider = Some(v.parse()?);
        }
        if let Some(v) = lookup("ASKDB_LLM_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = lookup("ASKDB_LLM_TEMPERATURE") {
            self.llm.temperature = parse_num("ASKDB_LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("ASKDB_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_num("ASKDB_LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("ASKDB_DIALECT") {
            self.prompt.dialect = v.parse()?;
        }
        if let Some(v) = lookup("ASKDB_TEMPLATE_PATH") {
            self.prompt.template_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ASKDB_STRICT_EXTRACTION") {
            self.strict_extraction = parse_bool("ASKDB_STRICT_EXTRACTION", &v)?;
        }
        if let Some(v) = lookup("ASKDB_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }

        if let Some(key) = lookup("ASKDB_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = match self.provider() {
                LlmProvider::OpenAI => lookup("OPENAI_API_KEY"),
                LlmProvider::Anthropic => lookup("ANTHROPIC_API_KEY"),
                LlmProvider::Ollama => None,
            };
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(AskError::config("llm.timeout_secs must be greater than zero"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AskError::config("llm.model must not be empty"));
        }
        let provider = self.provider();
        if provider.requires_api_key() && self.llm.api_key.is_none() {
            return Err(AskError::config(format!(
                "{} requires an API key (set ASKDB_LLM_API_KEY)",
                provider
            )));
        }
        if let Some(path) = &self.prompt.template_path {
            let path = expand_path(path);
            if !path.is_file() {
                return Err(AskError::config(format!(
                    "template {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Effective provider: explicit, or inferred from the model name.
    pub fn provider(&self) -> LlmProvider {
        self.llm
            .provider
            .unwrap_or_else(|| LlmProvider::from_model(&self.llm.model))
    }

    /// Bounded wait for the model.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Database path with `~` expanded.
    pub fn resolved_database_path(&self) -> PathBuf {
        expand_path(&self.database_path)
    }

    /// Connection descriptor for the configured database.
    pub fn database_target(&self) -> DatabaseTarget {
        DatabaseTarget::new(self.resolved_database_path())
            .read_only(self.read_only)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    /// Prompt builder for the configured template and dialect.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the template file cannot be loaded
    pub fn prompt_builder(&self) -> Result<PromptBuilder> {
        let template = match &self.prompt.template_path {
            Some(path) => PromptTemplate::from_file(&expand_path(path), self.prompt.dialect)?,
            None => PromptTemplate::builtin(self.prompt.dialect),
        };
        Ok(PromptBuilder::new(template))
    }

    /// HTTP gateway for the configured model.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the provider needs a missing key
    pub fn gateway(&self) -> Result<HttpGateway> {
        Ok(HttpGateway::new(
            self.provider(),
            self.llm.model.clone(),
            self.llm.endpoint.clone(),
            self.llm.api_key.clone(),
            self.gateway_timeout(),
        )?
        .with_temperature(self.llm.temperature))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => expand(s),
        None => path.to_path_buf(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AskError::config(format!("{}: expected a boolean, got '{}'", key, other))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AskError::config(format!("{}: expected a number, got '{}'", key, value)))
}
