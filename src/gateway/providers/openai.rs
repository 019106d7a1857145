//! `OpenAI` chat completions provider.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the endpoint override in [`GatewayConfig`].

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::http::{AuthHeader, HttpTransport, parse_json};
use crate::error::ProviderError;
use crate::gateway::config::GatewayConfig;
use crate::gateway::message::NormalizedRequest;
use crate::gateway::provider::ProviderAdapter;

const NAME: &str = "openai";

/// Wire request for `POST /chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// `OpenAI`-compatible LLM provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    transport: HttpTransport,
}

impl OpenAiProvider {
    /// Creates a new provider from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] if the credential is missing
    /// or the endpoint is invalid.
    pub fn new(config: &GatewayConfig) -> Result<Self, ProviderError> {
        let endpoint = config
            .effective_url()
            .ok_or_else(|| ProviderError::NotConfigured {
                provider: NAME,
                reason: "endpoint URL is missing".to_string(),
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

    /// Builds the wire request from our generic request.
    fn build_request(request: &NormalizedRequest) -> ChatCompletionRequest<'_> {
        let params = request.params();
        ChatCompletionRequest {
            model: request.model(),
            messages: request
                .turns()
                .iter()
                .map(|t| WireMessage {
                    role: t.role().as_str(),
                    content: t.content(),
                })
                .collect(),
            temperature: params.temperature,
            max_tokens: params.max_output_tokens,
            response_format: params.structured_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    /// Extracts `choices[0].message.content` from a response body.
    fn extract_content(body: &str) -> Result<String, ProviderError> {
        let json = parse_json(body)?;
        json.pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Protocol {
                message: "missing choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, request: &NormalizedRequest) -> Result<String, ProviderError> {
        let body = serde_json::to_value(Self::build_request(request)).map_err(|e| {
            ProviderError::Unexpected {
                message: format!("failed to encode request: {e}"),
            }
        })?;
        let text = self.transport.post_json(&body).await?;
        Self::extract_content(&text).inspect_err(|e| {
            warn!(provider = NAME, error = %e, "provider returned an unexpected body");
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::message::{GenerationParams, Turn};

    fn request(structured: bool) -> NormalizedRequest {
        NormalizedRequest::new(
            vec![Turn::system("Be brief."), Turn::user("hello")],
            "gpt-3.5-turbo",
            GenerationParams {
                temperature: 0.5,
                max_output_tokens: 100,
                structured_output: structured,
            },
        )
    }

    #[test]
    fn test_build_request_shape() {
        let req = request(false);
        let body = serde_json::to_value(OpenAiProvider::build_request(&req)).unwrap_or_default();
        assert_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "hello"}
                ],
                "temperature": 0.5,
                "max_tokens": 100
            })
        );
    }

    #[test]
    fn test_build_request_json_mode() {
        let req = request(true);
        let body = serde_json::to_value(OpenAiProvider::build_request(&req)).unwrap_or_default();
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
        assert_eq!(
            OpenAiProvider::extract_content(body),
            Ok("Hi there".to_string())
        );
    }

    #[test]
    fn test_extract_content_missing_path() {
        let result = OpenAiProvider::extract_content(r#"{"choices":[]}"#);
        assert!(matches!(result, Err(ProviderError::Protocol { .. })));

        let result = OpenAiProvider::extract_content(r#"{"choices":[{"message":{"content":null}}]}"#);
        assert!(matches!(result, Err(ProviderError::Protocol { .. })));
    }

    #[test]
    fn test_extract_content_not_json() {
        let result = OpenAiProvider::extract_content("Internal Server Error");
        assert!(matches!(result, Err(ProviderError::Protocol { .. })));
    }

    #[test]
    fn test_new_requires_key() {
        let config = GatewayConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            OpenAiProvider::new(&config),
            Err(ProviderError::NotConfigured { provider: "openai", .. })
        ));
    }
}
