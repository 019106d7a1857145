//! Shared HTTP transport for provider adapters.
//!
//! Every adapter goes through [`HttpTransport`] so they all share the same
//! timeout handling, auth header injection, and failure classification.

use std::time::Duration;

use reqwest::{Client, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MAX_ERROR_BODY_LEN, ProviderError};

/// How the credential is attached to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHeader {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// `x-api-key: <key>`.
    ApiKey,
}

/// An authenticated JSON-over-HTTPS client bound to one endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Duration,
    provider: &'static str,
}

impl HttpTransport {
    /// Creates a transport.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] if the key is blank, the key
    /// or an extra header is not a valid header value, or the endpoint is not
    /// a valid URL.
    pub fn new(
        provider: &'static str,
        endpoint: &str,
        api_key: &str,
        auth: AuthHeader,
        extra_headers: &[(&'static str, &str)],
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let not_configured = |reason: &str| ProviderError::NotConfigured {
            provider,
            reason: reason.to_string(),
        };

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(not_configured("API key is missing"));
        }
        reqwest::Url::parse(endpoint)
            .map_err(|e| not_configured(&format!("invalid endpoint URL '{endpoint}': {e}")))?;

        let mut headers = HeaderMap::new();
        let (name, value) = match auth {
            AuthHeader::Bearer => (AUTHORIZATION, format!("Bearer {api_key}")),
            AuthHeader::ApiKey => (HeaderName::from_static("x-api-key"), api_key.to_string()),
        };
        let mut value = HeaderValue::from_str(&value)
            .map_err(|_| not_configured("API key contains characters not allowed in a header"))?;
        value.set_sensitive(true);
        headers.insert(name, value);

        for (name, value) in extra_headers {
            let value = HeaderValue::from_str(value)
                .map_err(|_| not_configured(&format!("invalid value for header {name}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Unexpected {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
            provider,
        })
    }

    /// Endpoint this transport posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts `body` as JSON and returns the raw response body on 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Status`] for any non-2xx status,
    /// [`ProviderError::Timeout`] if the request timed out, and
    /// [`ProviderError::Network`] for other transport failures.
    pub async fn post_json(&self, body: &Value) -> Result<String, ProviderError> {
        debug!(provider = self.provider, endpoint = %self.endpoint, "sending provider request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped(response, MAX_ERROR_BODY_LEN)
                .await
                .map_err(|e| self.classify(&e))?;
            warn!(
                provider = self.provider,
                status = status.as_u16(),
                "provider returned non-success status"
            );
            return Err(ProviderError::status(status.as_u16(), &body));
        }

        let text = response.text().await.map_err(|e| self.classify(&e))?;

        debug!(
            provider = self.provider,
            status = status.as_u16(),
            bytes = text.len(),
            "provider response received"
        );
        Ok(text)
    }

    fn classify(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            return ProviderError::Timeout {
                timeout: self.timeout,
            };
        }
        ProviderError::Network {
            message: error_chain(err),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Parses a 2xx body as JSON.
///
/// # Errors
///
/// Returns [`ProviderError::Protocol`] if the body is not valid JSON.
pub fn parse_json(body: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Protocol {
        message: format!("response body is not valid JSON: {e}"),
    })
}

/// Reads at most `limit` bytes of the body, dropping the rest unread.
async fn read_capped(mut response: Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut buf = Vec::with_capacity(limit.min(1024));
    while buf.len() < limit {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = chunk.len().min(limit - buf.len());
        buf.extend_from_slice(&chunk[..take]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Joins an error with its sources, e.g. `"error sending request: connection refused"`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
