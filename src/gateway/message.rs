//! Provider-agnostic conversation types.
//!
//! These types decouple the gateway from any specific vendor wire format,
//! so the same history can be sent to `OpenAI`, Anthropic, or a custom API.

use serde::{Deserialize, Serialize};

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Behavioral instructions.
    System,
    /// User input.
    User,
    /// Model response.
    Assistant,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message unit in a conversation.
///
/// Fields are private so a turn cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Creates a turn with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Role of the speaker.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Message text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Sampling and output settings for a single call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature (0.0–2.0; at most 1.0 for Anthropic).
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
    /// Ask the provider for a JSON object.
    pub structured_output: bool,
}

/// A provider-agnostic completion request.
///
/// Built fresh for every call. Adapters receive it by shared reference and
/// never modify it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    turns: Vec<Turn>,
    model: String,
    params: GenerationParams,
}

impl NormalizedRequest {
    /// Creates a request from an ordered turn sequence.
    #[must_use]
    pub fn new(turns: Vec<Turn>, model: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            turns,
            model: model.into(),
            params,
        }
    }

    /// Ordered turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generation parameters.
    #[must_use]
    pub const fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Content of the most recent user turn, if any.
    #[must_use]
    pub fn last_user_content(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(Turn::content)
    }
}
