//! Generic custom REST provider.
//!
//! Posts `{message, model}` to an arbitrary endpoint and accepts almost any
//! 2xx reply: the `response` field, then `text`, then the whole body.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::http::{AuthHeader, HttpTransport};
use crate::error::ProviderError;
use crate::gateway::config::GatewayConfig;
use crate::gateway::message::NormalizedRequest;
use crate::gateway::provider::ProviderAdapter;

const NAME: &str = "custom";

#[derive(Debug, Serialize)]
struct CustomRequest<'a> {
    message: &'a str,
    model: &'a str,
}

/// Provider for schema-less third-party endpoints.
#[derive(Debug, Clone)]
pub struct CustomProvider {
    transport: HttpTransport,
}

impl CustomProvider {
    /// Creates a new provider from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] if the credential or the
    /// endpoint URL is missing. There is no default endpoint.
    pub fn new(config: &GatewayConfig) -> Result<Self, ProviderError> {
        let endpoint = config
            .effective_url()
            .ok_or_else(|| ProviderError::NotConfigured {
                provider: NAME,
                reason: "LLM_API_URL must be set for the custom provider".to_string(),
            })?;
        let transport = HttpTransport::new(
            NAME,
            endpoint,
            config.credential().unwrap_or_default(),
            AuthHeader::Bearer,
            &[],
            config.timeout,
        )?;
        Ok(Self { transport })
    }

    /// Pulls the answer out of a 2xx body.
    fn extract_content(body: &str) -> String {
        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return body.to_string();
        };
        ["response", "text"]
            .iter()
            .find_map(|key| match json.get(key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl ProviderAdapter for CustomProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, request: &NormalizedRequest) -> Result<String, ProviderError> {
        let wire = CustomRequest {
            message: request.last_user_content().unwrap_or_default(),
            model: request.model(),
        };
        let body = serde_json::to_value(&wire).map_err(|e| ProviderError::Unexpected {
            message: format!("failed to encode request: {e}"),
        })?;
        let text = self.transport.post_json(&body).await?;
        Ok(Self::extract_content(&text))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::gateway::config::ProviderKind;

    #[test_case(r#"{"response": "from response", "text": "from text"}"#, "from response" ; "response wins")]
    #[test_case(r#"{"text": "from text"}"#, "from text" ; "text fallback")]
    #[test_case(r#"{"response": null, "text": "from text"}"#, "from text" ; "null response skipped")]
    #[test_case(r#"{"response": {"answer": 42}}"#, r#"{"answer":42}"# ; "non-string response serialized")]
    #[test_case(r#"{"output": "elsewhere"}"#, r#"{"output": "elsewhere"}"# ; "whole body when no known key")]
    #[test_case("plain text reply", "plain text reply" ; "non json body")]
    fn test_extract_content(body: &str, expected: &str) {
        assert_eq!(CustomProvider::extract_content(body), expected);
    }

    #[test]
    fn test_new_requires_url() {
        let config = GatewayConfig::builder()
            .provider(ProviderKind::Custom)
            .api_key("key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            CustomProvider::new(&config),
            Err(ProviderError::NotConfigured { provider: "custom", .. })
        ));
    }

    #[test]
    fn test_new_with_url() {
        let config = GatewayConfig::builder()
            .provider(ProviderKind::Custom)
            .api_key("key")
            .api_url("https://llm.internal/chat")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(CustomProvider::new(&config).is_ok());
    }
}
