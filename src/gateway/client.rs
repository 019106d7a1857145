//! Provider factory.
//!
//! Maps the configured [`ProviderKind`] to a concrete [`ProviderAdapter`].

use std::sync::Arc;

use crate::error::ProviderError;
use crate::gateway::config::{GatewayConfig, ProviderKind};
use crate::gateway::provider::ProviderAdapter;
use crate::gateway::providers::{AnthropicProvider, CustomProvider, OpenAiProvider};

/// Creates a [`ProviderAdapter`] based on the configured provider.
///
/// # Supported Providers
///
/// - `openai` (default): `OpenAI`-compatible chat completions
/// - `anthropic`: Anthropic messages API
/// - `custom`: any endpoint accepting `{message, model}`
///
/// # Errors
///
/// Returns [`ProviderError::NotConfigured`] when the credential is missing
/// or blank, or when no usable endpoint is configured.
pub fn create_provider(config: &GatewayConfig) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    let provider: Arc<dyn ProviderAdapter> = match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderKind::Custom => Arc::new(CustomProvider::new(config)?),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(ProviderKind::OpenAi, "openai" ; "openai")]
    #[test_case(ProviderKind::Anthropic, "anthropic" ; "anthropic")]
    #[test_case(ProviderKind::Custom, "custom" ; "custom")]
    fn test_create_provider(kind: ProviderKind, name: &str) {
        let config = GatewayConfig::builder()
            .provider(kind)
            .api_key("test")
            .api_url("http://127.0.0.1:9/llm")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(provider.name(), name);
    }

    #[test]
    fn test_create_provider_without_key() {
        let config = GatewayConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let result = create_provider(&config);
        assert!(matches!(result, Err(ProviderError::NotConfigured { .. })));
    }
}
