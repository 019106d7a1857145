//! Pluggable LLM provider trait.
//!
//! Implementations translate a [`NormalizedRequest`] into one vendor's wire
//! format and the vendor's reply back into text. This keeps the gateway
//! decoupled from any particular LLM API.

use async_trait::async_trait;

use super::message::NormalizedRequest;
use crate::error::ProviderError;

/// Trait for LLM provider backends.
///
/// Implementations are stateless after construction and are shared across
/// concurrent calls. Every failure is returned as a [`ProviderError`];
/// `send` never panics on a malformed or unexpected response.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"anthropic"`).
    fn name(&self) -> &'static str;

    /// Issues exactly one outbound call for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on non-success status, unexpected body
    /// shape, timeout, or transport failure.
    async fn send(&self, request: &NormalizedRequest) -> Result<String, ProviderError>;
}
