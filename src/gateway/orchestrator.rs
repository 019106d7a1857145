//! Gateway orchestrator.
//!
//! [`GatewayClient::converse`] is the single entry point used by chat
//! front-ends. It builds the request for the selected [`Mode`], runs the
//! provider call on the [`ProviderExecutor`], post-processes the answer,
//! and always returns a [`Reply`] whose text can be shown to a user.
//!
//! Per call the flow is: building request, awaiting provider, then either
//! parsing structured output, appending history, or failing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FailureKind, ProviderError};
use crate::gateway::client::create_provider;
use crate::gateway::config::{GatewayConfig, Mode};
use crate::gateway::conversation::ConversationStore;
use crate::gateway::executor::ProviderExecutor;
use crate::gateway::message::{GenerationParams, NormalizedRequest, Turn};
use crate::gateway::prompt::{NOT_CONFIGURED_MESSAGE, build_structured_prompt, failure_message};
use crate::gateway::provider::ProviderAdapter;
use crate::gateway::structured;

/// Outcome of one [`GatewayClient::converse`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    /// Provider answered; in structured mode `text` is the payload as JSON.
    Answer {
        /// Answer text.
        text: String,
    },
    /// Structured extraction failed; `text` is the raw model output.
    Degraded {
        /// Unmodified model output.
        text: String,
    },
    /// Handled failure with a safe, user-facing message.
    Failure {
        /// Failure classification.
        kind: FailureKind,
        /// Message to show the user.
        message: String,
    },
}

impl Reply {
    fn failure(err: &ProviderError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: failure_message(&err.to_string()),
        }
    }

    /// Text to deliver to the user.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Answer { text } | Self::Degraded { text } => text,
            Self::Failure { message, .. } => message,
        }
    }

    /// Failure kind, if the reply is not a clean answer.
    #[must_use]
    pub const fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Answer { .. } => None,
            Self::Degraded { .. } => Some(FailureKind::ParseFailure),
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Returns `true` for answers and degraded answers.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

/// Provider resolved at construction.
enum Backend {
    Ready(Arc<dyn ProviderAdapter>),
    Unconfigured(ProviderError),
}

/// Conversational gateway in front of one LLM provider.
pub struct GatewayClient {
    backend: Backend,
    store: ConversationStore,
    executor: ProviderExecutor,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Creates a client for the configured provider.
    ///
    /// A missing credential or endpoint is not an error here: the client
    /// is still built and every [`converse`](Self::converse) call replies
    /// with a not-configured message without touching the network.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let backend = match create_provider(&config) {
            Ok(provider) => Backend::Ready(provider),
            Err(e) => {
                warn!(provider = config.provider.as_str(), error = %e, "LLM provider not configured; replies will explain how to configure it");
                Backend::Unconfigured(e)
            }
        };
        Self::with_backend(backend, config)
    }

    /// Creates a client around an existing adapter.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ProviderAdapter>, config: GatewayConfig) -> Self {
        Self::with_backend(Backend::Ready(provider), config)
    }

    fn with_backend(backend: Backend, config: GatewayConfig) -> Self {
        Self {
            backend,
            store: ConversationStore::from_config(&config),
            executor: ProviderExecutor::from_config(&config),
            config,
        }
    }

    /// Returns `true` if a provider is ready to be called.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    /// Name of the active provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match &self.backend {
            Backend::Ready(provider) => provider.name(),
            Backend::Unconfigured(_) => self.config.provider.as_str(),
        }
    }

    /// Mode used when the caller has no preference.
    #[must_use]
    pub const fn default_mode(&self) -> Mode {
        if self.config.structured_output {
            Mode::Structured
        } else {
            Mode::Conversational
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Conversation history backing conversational mode.
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Resets conversation `id` to its system turn.
    pub async fn reset(&self, id: &str) {
        self.store.reset(id).await;
    }

    /// Snapshot of the turns recorded for conversation `id`.
    ///
    /// Unknown ids yield an empty history and are not created.
    pub async fn history(&self, id: &str) -> Vec<Turn> {
        self.store
            .snapshot(id)
            .await
            .map(|c| c.turns().to_vec())
            .unwrap_or_default()
    }

    /// Sends `text` to the provider and returns a user-deliverable reply.
    ///
    /// Only `Mode::Conversational` reads or writes history for `id`. Calls
    /// sharing an id are serialised; different ids run in parallel.
    pub async fn converse(&self, id: &str, text: &str, mode: Mode) -> Reply {
        let provider = match &self.backend {
            Backend::Ready(provider) => Arc::clone(provider),
            Backend::Unconfigured(e) => {
                debug!(id, error = %e, "Skipping call: provider not configured");
                return self.not_configured(e);
            }
        };

        match mode {
            Mode::Conversational => self.converse_with_history(provider, id, text).await,
            Mode::Bare => {
                debug!(id, stage = "building_request", mode = "bare", "Building request");
                let request = self.request(self.single_turn(Turn::user(text)), false);
                match self.call(provider, request).await {
                    Ok(answer) => Reply::Answer { text: answer },
                    Err(e) => Reply::failure(&e),
                }
            }
            Mode::Structured => {
                debug!(id, stage = "building_request", mode = "structured", "Building request");
                let prompt = build_structured_prompt(text);
                let request = self.request(self.single_turn(Turn::user(prompt)), true);
                match self.call(provider, request).await {
                    Ok(raw) => Self::parse_structured(id, raw),
                    Err(e) => Reply::failure(&e),
                }
            }
        }
    }

    async fn converse_with_history(
        &self,
        provider: Arc<dyn ProviderAdapter>,
        id: &str,
        text: &str,
    ) -> Reply {
        let mut conversation = self.store.lock(id).await;
        debug!(id, stage = "building_request", mode = "conversational", turns = conversation.len(), "Building request");
        if let Err(e) = conversation.push(Turn::user(text)) {
            return Reply::failure(&ProviderError::Unexpected {
                message: e.to_string(),
            });
        }
        let request = self.request(conversation.turns().to_vec(), false);

        match self.call(provider, request).await {
            Ok(answer) if answer.trim().is_empty() => {
                // Empty assistant content is rejected by some providers on resend
                warn!(id, "Provider returned a blank answer; not recording it");
                Reply::Answer { text: answer }
            }
            Ok(answer) => {
                debug!(id, stage = "appending_history", "Appending assistant turn");
                if let Err(e) = conversation.push(Turn::assistant(answer.as_str())) {
                    return Reply::failure(&ProviderError::Unexpected {
                        message: e.to_string(),
                    });
                }
                Reply::Answer { text: answer }
            }
            // The unanswered user turn stays so the next call retries it
            Err(e) => Reply::failure(&e),
        }
    }

    async fn call(
        &self,
        provider: Arc<dyn ProviderAdapter>,
        request: NormalizedRequest,
    ) -> Result<String, ProviderError> {
        let provider_name = provider.name();
        debug!(provider = provider_name, stage = "awaiting_provider", turns = request.turns().len(), "Awaiting provider");
        let result = self.executor.run(provider, request).await;
        if let Err(e) = &result {
            warn!(provider = provider_name, stage = "failed", kind = %e.kind(), error = %e, "LLM request failed");
        }
        result
    }

    fn parse_structured(id: &str, raw: String) -> Reply {
        debug!(id, stage = "parsing_structured", bytes = raw.len(), "Parsing structured output");
        match structured::extract_tagged(&raw) {
            Ok((strategy, payload)) => {
                debug!(id, strategy, "Structured payload extracted");
                Reply::Answer {
                    text: payload.to_pretty_json(),
                }
            }
            Err(failure) => {
                warn!(id, bytes = raw.len(), "No structured payload in model output; returning raw text");
                Reply::Degraded { text: failure.raw }
            }
        }
    }

    /// Persona turn (if any) followed by `turn`.
    fn single_turn(&self, turn: Turn) -> Vec<Turn> {
        let persona = self.config.system_prompt.trim();
        let mut turns = Vec::with_capacity(2);
        if !persona.is_empty() {
            turns.push(Turn::system(self.config.system_prompt.as_str()));
        }
        turns.push(turn);
        turns
    }

    fn request(&self, turns: Vec<Turn>, structured_output: bool) -> NormalizedRequest {
        NormalizedRequest::new(
            turns,
            self.config.effective_model(),
            GenerationParams {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
                structured_output,
            },
        )
    }

    fn not_configured(&self, err: &ProviderError) -> Reply {
        // Without a key the fixed hint applies; otherwise say what is missing
        let message = if self.config.credential().is_none() {
            NOT_CONFIGURED_MESSAGE.to_string()
        } else {
            failure_message(&err.to_string())
        };
        Reply::Failure {
            kind: FailureKind::NotConfigured,
            message,
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("provider", &self.provider_name())
            .field("configured", &self.is_configured())
            .field("conversations", &self.store.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::gateway::message::Role;
    use crate::gateway::prompt::FAILURE_PREFIX;

    /// Replays scripted results and records every request.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        seen: Mutex<Vec<NormalizedRequest>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            })
        }

        fn seen(&self) -> Vec<NormalizedRequest> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ProviderAdapter for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn send(&self, request: &NormalizedRequest) -> Result<String, ProviderError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .lock()
                .ok()
                .and_then(|mut r| r.pop_front())
                .unwrap_or_else(|| Ok("default".to_string()))
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::builder()
            .api_key("test-key")
            .system_prompt("persona")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn test_conversational_scenario() {
        let provider = Scripted::new(vec![Ok("Try 'Gone Girl'.".to_string())]);
        let client = GatewayClient::with_provider(provider.clone(), config());

        let reply = client
            .converse("chat-1", "Recommend a mystery novel.", Mode::Conversational)
            .await;
        assert_eq!(
            reply,
            Reply::Answer {
                text: "Try 'Gone Girl'.".to_string()
            }
        );

        let seen = provider.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].turns(),
            &[
                Turn::system("persona"),
                Turn::user("Recommend a mystery novel."),
            ]
        );
        assert_eq!(
            client.history("chat-1").await,
            vec![
                Turn::system("persona"),
                Turn::user("Recommend a mystery novel."),
                Turn::assistant("Try 'Gone Girl'."),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_user_turn() {
        let provider = Scripted::new(vec![Err(ProviderError::status(429, "rate limited"))]);
        let client = GatewayClient::with_provider(provider, config());

        let reply = client.converse("c", "hello", Mode::Conversational).await;
        assert_eq!(reply.kind(), Some(FailureKind::ProviderError));
        assert!(reply.text().starts_with(FAILURE_PREFIX));
        assert!(reply.text().contains("429"));

        let history = client.history("c").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], Turn::user("hello"));
    }

    #[tokio::test]
    async fn test_retry_after_failure_resends_pending_turn() {
        let provider = Scripted::new(vec![
            Err(ProviderError::Network {
                message: "connection refused".to_string(),
            }),
            Ok("ok".to_string()),
        ]);
        let client = GatewayClient::with_provider(provider.clone(), config());

        let _ = client.converse("c", "first", Mode::Conversational).await;
        let reply = client.converse("c", "second", Mode::Conversational).await;
        assert!(reply.is_success());

        let seen = provider.seen();
        let roles: Vec<Role> = seen[1].turns().iter().map(Turn::role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
    }

    #[tokio::test]
    async fn test_bare_mode_is_stateless_and_uncached() {
        let provider = Scripted::new(vec![Ok("one".to_string()), Ok("two".to_string())]);
        let client = GatewayClient::with_provider(provider.clone(), config());

        let first = client.converse("c", "same", Mode::Bare).await;
        let second = client.converse("c", "same", Mode::Bare).await;
        assert_eq!(first.text(), "one");
        assert_eq!(second.text(), "two");

        let seen = provider.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert!(!client.store().contains("c"));
    }

    #[tokio::test]
    async fn test_structured_mode_parses_payload() {
        let raw = "```json\n{\"response\": \"Hi\", \"keywords\": [\"greeting\"]}\n```";
        let provider = Scripted::new(vec![Ok(raw.to_string())]);
        let client = GatewayClient::with_provider(provider.clone(), config());

        let reply = client.converse("c", "hello", Mode::Structured).await;
        let Reply::Answer { text } = &reply else {
            panic!("expected answer, got {reply:?}");
        };
        let value: serde_json::Value = serde_json::from_str(text).unwrap_or_default();
        assert_eq!(value["response"], "Hi");
        assert_eq!(value["keywords"][0], "greeting");

        let seen = provider.seen();
        assert!(seen[0].params().structured_output);
        assert!(seen[0].last_user_content().unwrap_or_default().contains("hello"));
        assert!(!client.store().contains("c"));
    }

    #[tokio::test]
    async fn test_structured_mode_degrades_to_raw_text() {
        let provider = Scripted::new(vec![Ok("not json at all".to_string())]);
        let client = GatewayClient::with_provider(provider, config());

        let reply = client.converse("c", "hello", Mode::Structured).await;
        assert_eq!(
            reply,
            Reply::Degraded {
                text: "not json at all".to_string()
            }
        );
        assert_eq!(reply.kind(), Some(FailureKind::ParseFailure));
        assert!(reply.is_success());
    }

    #[tokio::test]
    async fn test_not_configured_short_circuits() {
        let client = GatewayClient::new(
            GatewayConfig::builder()
                .build()
                .unwrap_or_else(|_| unreachable!()),
        );
        assert!(!client.is_configured());
        assert_eq!(client.provider_name(), "openai");

        let reply = client.converse("c", "hello", Mode::Conversational).await;
        assert_eq!(
            reply,
            Reply::Failure {
                kind: FailureKind::NotConfigured,
                message: NOT_CONFIGURED_MESSAGE.to_string(),
            }
        );
        assert!(!client.store().contains("c"));
    }

    #[tokio::test]
    async fn test_timeout_reply() {
        let provider = Arc::new(Scripted {
            delay: Duration::from_millis(300),
            ..Scripted::default()
        });
        let config = GatewayConfig::builder()
            .api_key("k")
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap_or_else(|_| unreachable!());
        let client = GatewayClient::with_provider(provider, config);

        let reply = client.converse("c", "hello", Mode::Bare).await;
        assert_eq!(reply.kind(), Some(FailureKind::Timeout));
        assert!(reply.text().starts_with(FAILURE_PREFIX));
    }

    #[tokio::test]
    async fn test_concurrent_same_id_is_serialised() {
        let provider = Arc::new(Scripted {
            delay: Duration::from_millis(20),
            ..Scripted::default()
        });
        let client = Arc::new(GatewayClient::with_provider(provider, config()));

        let a = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.converse("c", "A", Mode::Conversational).await })
        };
        let b = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.converse("c", "B", Mode::Conversational).await })
        };
        let _ = a.await;
        let _ = b.await;

        let history = client.history("c").await;
        let roles: Vec<Role> = history.iter().map(Turn::role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_answer_is_not_recorded() {
        let provider = Scripted::new(vec![Ok("  ".to_string()), Ok("second".to_string())]);
        let client = GatewayClient::with_provider(provider.clone(), config());

        let reply = client.converse("c", "first", Mode::Conversational).await;
        assert!(reply.is_success());
        assert_eq!(
            client.history("c").await,
            vec![Turn::system("persona"), Turn::user("first")]
        );

        let _ = client.converse("c", "again", Mode::Conversational).await;
        let seen = provider.seen();
        assert!(seen[1].turns().iter().all(|t| !t.content().trim().is_empty()));
    }

    #[tokio::test]
    async fn test_history_of_unknown_id_creates_nothing() {
        let provider = Scripted::new(vec![]);
        let client = GatewayClient::with_provider(provider, config());
        assert!(client.history("nobody").await.is_empty());
        assert!(client.store().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let provider = Scripted::new(vec![]);
        let client = GatewayClient::with_provider(provider, config());
        let _ = client.converse("c", "hi", Mode::Conversational).await;
        client.reset("c").await;
        assert_eq!(client.history("c").await, vec![Turn::system("persona")]);
    }

    #[test]
    fn test_default_mode_follows_structured_toggle() {
        let provider = Scripted::new(vec![]);
        let config = GatewayConfig::builder()
            .api_key("k")
            .structured_output(true)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let client = GatewayClient::with_provider(provider, config);
        assert_eq!(client.default_mode(), Mode::Structured);
    }

    #[test]
    fn test_reply_serializes_with_status_tag() {
        let reply = Reply::Failure {
            kind: FailureKind::Timeout,
            message: "m".to_string(),
        };
        let value = serde_json::to_value(&reply).unwrap_or_default();
        assert_eq!(
            value,
            serde_json::json!({"status": "failure", "kind": "timeout", "message": "m"})
        );
    }
}
