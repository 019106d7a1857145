//! LLM gateway client.
//!
//! Sits between a chat front-end and one of several interchangeable LLM
//! backends, normalising their wire formats behind [`ProviderAdapter`].
//!
//! # Architecture
//!
//! ```text
//! converse(id, text, mode) → GatewayClient
//!   ├── ConversationStore (conversational mode: lock id, append user turn)
//!   ├── NormalizedRequest → ProviderExecutor (worker task + timeout)
//!   │   └── ProviderAdapter: OpenAI | Anthropic | Custom
//!   ├── structured::extract (structured mode)
//!   └── Reply: Answer | Degraded | Failure
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod structured;

// Re-export key types
pub use client::create_provider;
pub use config::{GatewayConfig, GatewayConfigBuilder, Mode, ProviderKind};
pub use conversation::{Conversation, ConversationStore};
pub use executor::ProviderExecutor;
pub use message::{GenerationParams, NormalizedRequest, Role, Turn};
pub use orchestrator::{GatewayClient, Reply};
pub use provider::ProviderAdapter;
pub use structured::{StructuredPayload, extract};
