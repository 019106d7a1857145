//! Gateway configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! A missing API key is a valid state; the gateway answers with a fixed
//! "not configured" message instead of failing at startup.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::error::ConfigError;

/// Default `OpenAI` chat completions endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default Anthropic messages endpoint.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
/// Default model for `OpenAI` and custom providers.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// Default model for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
/// Default Anthropic API version header value.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default maximum output tokens.
const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default number of concurrent provider calls.
const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Which wire protocol to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    /// `OpenAI`-compatible chat completions.
    #[default]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Schema-less custom REST endpoint.
    Custom,
}

impl ProviderKind {
    /// Parses a provider name (case-insensitive).
    ///
    /// Unknown names fall back to [`ProviderKind::OpenAi`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "custom" => Self::Custom,
            other => {
                warn!(provider = other, "unknown provider, falling back to openai");
                Self::OpenAi
            }
        }
    }

    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Custom => "custom",
        }
    }

    /// Endpoint used when none is configured.
    #[must_use]
    pub const fn default_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some(DEFAULT_OPENAI_URL),
            Self::Anthropic => Some(DEFAULT_ANTHROPIC_URL),
            Self::Custom => None,
        }
    }

    /// Highest sampling temperature the upstream API accepts.
    #[must_use]
    pub const fn max_temperature(&self) -> f64 {
        match self {
            Self::OpenAi | Self::Custom => 2.0,
            Self::Anthropic => 1.0,
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi | Self::Custom => DEFAULT_OPENAI_MODEL,
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a user utterance is turned into a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Single user turn, no history.
    Bare,
    /// Full conversation history with a persona system turn.
    Conversational,
    /// Single templated turn asking for a JSON object.
    Structured,
}

impl Mode {
    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bare => "bare",
            Self::Conversational => "conversational",
            Self::Structured => "structured",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bare" => Ok(Self::Bare),
            "conversational" | "chat" => Ok(Self::Conversational),
            "structured" | "json" => Ok(Self::Structured),
            _ => Err(ConfigError::UnknownMode {
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Provider selector.
    pub provider: ProviderKind,
    /// API credential. `None` or blank means not configured.
    pub api_key: Option<String>,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Default to structured mode.
    pub structured_output: bool,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Maximum concurrent provider calls.
    pub max_concurrency: usize,
    /// Persona text placed as the first turn of every conversation.
    pub system_prompt: String,
    /// Maximum retained non-system turns per conversation (`None` = unbounded).
    pub max_history_turns: Option<usize>,
    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,
}

impl GatewayConfig {
    /// Creates a new builder for `GatewayConfig`.
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is out of range or unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }

    /// Returns the credential if it is present and non-blank.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Endpoint to call: the override, or the provider default.
    #[must_use]
    pub fn effective_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.provider.default_url())
    }

    /// Model to request: the override, or the provider default.
    #[must_use]
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("structured_output", &self.structured_output)
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_history_turns", &self.max_history_turns)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Clone, Default)]
pub struct GatewayConfigBuilder {
    provider: Option<ProviderKind>,
    api_key: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    structured_output: Option<bool>,
    timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    system_prompt: Option<String>,
    max_history_turns: Option<usize>,
    anthropic_version: Option<String>,
    env_errors: Vec<ConfigError>,
}

impl GatewayConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// Unparsable numeric values are reported by [`build`](Self::build).
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_lookup(|var| std::env::var(var).ok())
    }

    /// Populates unset fields from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.is_none() {
            self.provider = lookup("LLM_PROVIDER").map(|p| ProviderKind::parse(&p));
        }
        if self.api_key.is_none() {
            self.api_key = lookup("LLM_API_KEY");
        }
        if self.api_url.is_none() {
            self.api_url = lookup("LLM_API_URL");
        }
        if self.model.is_none() {
            self.model = lookup("LLM_MODEL");
        }
        if self.temperature.is_none() {
            self.temperature = self.parse_var(&lookup, "LLM_TEMPERATURE");
        }
        if self.max_tokens.is_none() {
            self.max_tokens = self.parse_var(&lookup, "LLM_MAX_TOKENS");
        }
        if self.structured_output.is_none() {
            self.structured_output = lookup("LLM_STRUCTURED_OUTPUT")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"));
        }
        if self.timeout.is_none() {
            self.timeout = self
                .parse_var::<u64, _>(&lookup, "LLM_TIMEOUT_SECS")
                .map(Duration::from_secs);
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = self.parse_var(&lookup, "LLM_MAX_CONCURRENCY");
        }
        if self.system_prompt.is_none() {
            self.system_prompt = lookup("LLM_SYSTEM_PROMPT");
        }
        if self.max_history_turns.is_none() {
            self.max_history_turns = self.parse_var(&lookup, "LLM_MAX_HISTORY_TURNS");
        }
        if self.anthropic_version.is_none() {
            self.anthropic_version = lookup("LLM_ANTHROPIC_VERSION");
        }
        self
    }

    fn parse_var<T, F>(&mut self, lookup: &F, var: &'static str) -> Option<T>
    where
        T: FromStr,
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(var)?;
        if let Ok(value) = raw.trim().parse() {
            Some(value)
        } else {
            self.env_errors.push(ConfigError::InvalidEnv { var, value: raw });
            None
        }
    }

    /// Sets the provider.
    #[must_use]
    pub const fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the maximum output tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Enables structured output as the default mode.
    #[must_use]
    pub const fn structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = Some(enabled);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum number of concurrent provider calls.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the persona system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Caps retained non-system turns per conversation.
    #[must_use]
    pub const fn max_history_turns(mut self, n: usize) -> Self {
        self.max_history_turns = Some(n);
        self
    }

    /// Sets the `anthropic-version` header value.
    #[must_use]
    pub fn anthropic_version(mut self, version: impl Into<String>) -> Self {
        self.anthropic_version = Some(version.into());
        self
    }

    /// Builds the [`GatewayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for out-of-range values or unparsable
    /// environment variables. A missing API key is not an error.
    pub fn build(mut self) -> Result<GatewayConfig, ConfigError> {
        if !self.env_errors.is_empty() {
            return Err(self.env_errors.remove(0));
        }

        let provider = self.provider.unwrap_or_default();
        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let max = provider.max_temperature();
        if !(0.0..=max).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature {
                provider: provider.as_str(),
                value: temperature,
                max,
            });
        }

        let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::Zero {
                field: "max_tokens",
            });
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(ConfigError::Zero { field: "timeout" });
        }

        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "max_concurrency",
            });
        }

        if self.max_history_turns == Some(0) {
            return Err(ConfigError::Zero {
                field: "max_history_turns",
            });
        }

        Ok(GatewayConfig {
            provider,
            api_key: self.api_key,
            api_url: self.api_url,
            model: self.model,
            temperature,
            max_tokens,
            structured_output: self.structured_output.unwrap_or(false),
            timeout,
            max_concurrency,
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_history_turns: self.max_history_turns,
            anthropic_version: self
                .anthropic_version
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_VERSION.to_string()),
        })
    }
}
