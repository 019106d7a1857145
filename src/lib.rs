//! # llm-gateway
//!
//! A conversational gateway between a chat front-end and interchangeable
//! LLM backends (`OpenAI`-compatible, Anthropic, or a custom REST endpoint).
//!
//! ## Features
//!
//! - One [`ProviderAdapter`](gateway::ProviderAdapter) interface over three
//!   incompatible wire formats
//! - Per-conversation history with reset and an optional turn cap
//! - Staged recovery of JSON payloads from free-form model output
//! - Bounded worker pool with per-call timeout and a typed failure taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use llm_gateway::{GatewayClient, GatewayConfig, Mode};
//!
//! # async fn run() -> llm_gateway::Result<()> {
//! let config = GatewayConfig::from_env()?;
//! let client = GatewayClient::new(config);
//! let reply = client
//!     .converse("chat-42", "Recommend a mystery novel.", Mode::Conversational)
//!     .await;
//! let _ = reply.text();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod gateway;

pub use error::{Error, FailureKind, ProviderError, Result};
pub use gateway::{GatewayClient, GatewayConfig, Mode, Reply};
