//! Anthropic messages API provider.
//!
//! The messages API has no system role: system turns are lifted into the
//! top-level `system` field, and adjacent turns with the same role are
//! merged because the API requires strictly alternating roles.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::http::{AuthHeader, HttpTransport, parse_json};
use crate::error::ProviderError;
use crate::gateway::config::GatewayConfig;
use crate::gateway::message::{NormalizedRequest, Role};
use crate::gateway::provider::ProviderAdapter;

const NAME: &str = "anthropic";

/// Wire request for `POST /v1/messages`.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireMessage {
    role: &'static str,
    content: String,
}

/// Anthropic LLM provider.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    transport: HttpTransport,
}

impl AnthropicProvider {
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
            AuthHeader::ApiKey,
            &[("anthropic-version", config.anthropic_version.as_str())],
            config.timeout,
        )?;
        Ok(Self { transport })
    }

    fn build_request(request: &NormalizedRequest) -> MessagesRequest<'_> {
        let system: Vec<&str> = request
            .turns()
            .iter()
            .filter(|t| t.role() == Role::System)
            .map(|t| t.content())
            .collect();

        let mut messages: Vec<WireMessage> = Vec::new();
        for turn in request.turns().iter().filter(|t| t.role() != Role::System) {
            let role = turn.role().as_str();
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push_str("\n\n");
                    last.content.push_str(turn.content());
                }
                _ => messages.push(WireMessage {
                    role,
                    content: turn.content().to_string(),
                }),
            }
        }

        let params = request.params();
        MessagesRequest {
            model: request.model(),
            max_tokens: params.max_output_tokens,
            temperature: params.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
        }
    }

    /// Extracts `content[0].text` from a response body.
    fn extract_content(body: &str) -> Result<String, ProviderError> {
        let json = parse_json(body)?;
        json.pointer("/content/0/text")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Protocol {
                message: "missing content[0].text".to_string(),
            })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
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
