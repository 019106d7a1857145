//! Error types for the gateway.
//!
//! Provider failures never cross the adapter boundary as panics; they are
//! returned as [`ProviderError`] values and classified by [`FailureKind`].

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum byte length of a provider error body kept in [`ProviderError::Status`].
pub const MAX_ERROR_BODY_LEN: usize = 500;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Conversation history rejected a mutation.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// CLI command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing credential or endpoint, detected before any network call.
    NotConfigured,
    /// Non-2xx status from the provider, or an unclassified fault.
    ProviderError,
    /// 2xx response whose body does not match the expected schema.
    ProtocolError,
    /// The provider call did not finish within the configured timeout.
    Timeout,
    /// Connection-level failure.
    NetworkError,
    /// Structured extraction found no payload (degraded success).
    ParseFailure,
}

impl FailureKind {
    /// Returns the snake-case name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::ProviderError => "provider_error",
            Self::ProtocolError => "protocol_error",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::ParseFailure => "parse_failure",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by provider adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credential or endpoint missing.
    #[error("{provider} provider is not configured: {reason}")]
    NotConfigured {
        /// Provider name.
        provider: &'static str,
        /// What is missing.
        reason: String,
    },

    /// Provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to [`MAX_ERROR_BODY_LEN`] bytes.
        body: String,
    },

    /// Success status but the body did not have the expected shape.
    #[error("unexpected response format: {message}")]
    Protocol {
        /// Description of the mismatch.
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("request timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Connection or transport failure.
    #[error("network error: {message}")]
    Network {
        /// Transport error message.
        message: String,
    },

    /// Fault outside the typed taxonomy (e.g. a panicked worker task).
    #[error("unexpected failure: {message}")]
    Unexpected {
        /// Underlying detail.
        message: String,
    },
}

impl ProviderError {
    /// Creates a [`ProviderError::Status`], truncating the body.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_at_boundary(body, MAX_ERROR_BODY_LEN).to_string(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured { .. } => FailureKind::NotConfigured,
            Self::Status { .. } | Self::Unexpected { .. } => FailureKind::ProviderError,
            Self::Protocol { .. } => FailureKind::ProtocolError,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Network { .. } => FailureKind::NetworkError,
        }
    }
}

/// Structured extraction exhausted every strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no structured payload found in model output ({} bytes)", raw.len())]
pub struct ParseFailure {
    /// The model output, unchanged.
    pub raw: String,
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Temperature outside the range the provider accepts.
    #[error("temperature for {provider} must be between 0.0 and {max:.1}, got {value}")]
    InvalidTemperature {
        /// Provider the range applies to.
        provider: &'static str,
        /// Rejected value.
        value: f64,
        /// Upper bound for the provider.
        max: f64,
    },

    /// A count that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Field name.
        field: &'static str,
    },

    /// Unknown conversation mode name.
    #[error("unknown mode '{name}' (expected bare, conversational, or structured)")]
    UnknownMode {
        /// Rejected name.
        name: String,
    },

    /// Environment variable present but unparsable.
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Conversation history rejected a mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// Only the store may place the system turn, and only at the start.
    #[error("system turns cannot be appended to conversation '{id}'")]
    SystemTurn {
        /// Conversation key.
        id: String,
    },
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output formatting failed.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command could not run (e.g. runtime startup failed).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Truncates `s` to at most `max_len` bytes without splitting a character.
#[must_use]
pub fn truncate_at_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
