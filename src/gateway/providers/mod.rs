//! Concrete [`ProviderAdapter`](super::provider::ProviderAdapter) implementations.

pub mod anthropic;
pub mod custom;
pub mod http;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use custom::CustomProvider;
pub use http::{AuthHeader, HttpTransport};
pub use openai::OpenAiProvider;
