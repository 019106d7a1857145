//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::error::ConfigError;
use crate::gateway::{GatewayConfig, GatewayConfigBuilder, Mode, ProviderKind};

/// LLM gateway: chat with `OpenAI`, Anthropic, or a custom LLM endpoint.
///
/// Flags override the `LLM_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "llm-gateway")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Provider: openai, anthropic, or custom.
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// API credential.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Endpoint URL override.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Model identifier.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature (0.0-2.0, Anthropic 0.0-1.0).
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// Maximum output tokens.
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Provider call timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Persona text sent as the system turn.
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Maximum retained turns per conversation.
    #[arg(long, global = true)]
    pub max_history_turns: Option<usize>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat on stdin/stdout.
    ///
    /// Lines starting with `/` are commands (/start, /help, /reset, /quit);
    /// everything else is sent to the model.
    #[command(after_help = r#"Examples:
  llm-gateway chat                          # Conversational mode
  llm-gateway chat --mode structured        # JSON answers
  LLM_PROVIDER=anthropic LLM_API_KEY=sk-ant-... llm-gateway chat
"#)]
    Chat {
        /// Mode: bare, conversational, structured. Defaults to
        /// structured when `LLM_STRUCTURED_OUTPUT` is set.
        #[arg(short, long)]
        mode: Option<String>,

        /// Conversation key.
        #[arg(short, long, default_value = "terminal")]
        conversation: String,
    },

    /// Send one message and print the reply.
    #[command(after_help = r#"Examples:
  llm-gateway ask "Recommend a mystery novel."
  llm-gateway ask "Explain TCP" --mode structured --format json | jq .text
"#)]
    Ask {
        /// Message text.
        text: String,

        /// Mode: bare, conversational, structured.
        #[arg(short, long, default_value = "bare")]
        mode: String,

        /// Output format (text, json).
        #[arg(long, default_value = "text")]
        format: String,
    },
}

impl Cli {
    /// Applies flag overrides on top of `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a flag value is invalid.
    pub fn apply_overrides(
        &self,
        mut builder: GatewayConfigBuilder,
    ) -> Result<GatewayConfigBuilder, ConfigError> {
        if let Some(provider) = &self.provider {
            builder = builder.provider(ProviderKind::parse(provider));
        }
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = &self.api_url {
            builder = builder.api_url(url);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if let Some(n) = self.max_tokens {
            builder = builder.max_tokens(n);
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(ConfigError::Zero { field: "timeout" });
            }
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(prompt) = &self.system_prompt {
            builder = builder.system_prompt(prompt);
        }
        if let Some(n) = self.max_history_turns {
            builder = builder.max_history_turns(n);
        }
        Ok(builder)
    }

    /// Resolves configuration: flags, then environment, then defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is invalid.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        self.apply_overrides(GatewayConfig::builder())?
            .from_env()
            .build()
    }
}

/// Parses an optional mode name.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownMode`] for unrecognized names.
pub fn parse_mode(name: Option<&str>) -> Result<Option<Mode>, ConfigError> {
    name.map(str::parse::<Mode>).transpose()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "llm-gateway",
            "ask",
            "hello",
            "--provider",
            "anthropic",
            "--temperature",
            "0.2",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.provider.as_deref(), Some("anthropic"));
        assert_eq!(cli.temperature, Some(0.2));
        assert!(matches!(cli.command, Commands::Ask { ref text, .. } if text == "hello"));
    }

    #[test]
    fn test_overrides_win() {
        let cli = Cli::try_parse_from([
            "llm-gateway",
            "--api-key",
            "flag-key",
            "--model",
            "gpt-4o",
            "--max-history-turns",
            "10",
            "chat",
        ])
        .unwrap_or_else(|_| unreachable!());
        let config = cli
            .apply_overrides(GatewayConfig::builder())
            .and_then(GatewayConfigBuilder::build)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.credential(), Some("flag-key"));
        assert_eq!(config.effective_model(), "gpt-4o");
        assert_eq!(config.max_history_turns, Some(10));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = Cli::try_parse_from(["llm-gateway", "--timeout", "0", "chat"])
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            cli.apply_overrides(GatewayConfig::builder()),
            Err(ConfigError::Zero { field: "timeout" })
        ));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None), Ok(None));
        assert_eq!(parse_mode(Some("bare")), Ok(Some(Mode::Bare)));
        assert!(parse_mode(Some("loud")).is_err());
    }
}
