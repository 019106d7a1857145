//! CLI command implementations.
//!
//! The terminal front-end plays the chat-transport role: it forwards each
//! line to [`GatewayClient::converse`] and prints the reply. Handled
//! failures are replies, not errors, so they never change the exit code.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::cli::output::{OutputFormat, format_reply};
use crate::cli::parser::{Cli, Commands, parse_mode};
use crate::error::{CommandError, Result};
use crate::gateway::prompt::{GREETING, HELP_TEXT};
use crate::gateway::{GatewayClient, Mode};

/// Slash commands understood by `chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatCommand {
    Start,
    Help,
    Reset,
    Quit,
    Unknown,
}

impl ChatCommand {
    /// Returns `None` for ordinary messages.
    fn parse(line: &str) -> Option<Self> {
        let word = line.strip_prefix('/')?.split_whitespace().next()?;
        // Telegram-style "/help@botname"
        let word = word.split('@').next().unwrap_or(word);
        Some(match word.to_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "reset" | "new" => Self::Reset,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown,
        })
    }
}

/// Executes the CLI command, reading chat input from `input`.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the async runtime cannot
/// start, or reading/writing the terminal fails.
pub fn execute<R: BufRead, W: Write>(cli: &Cli, input: R, output: &mut W) -> Result<()> {
    let config = cli.gateway_config()?;
    debug!(?config, "Resolved configuration");
    let client = GatewayClient::new(config);

    // Sync/async bridge
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")))?;

    match &cli.command {
        Commands::Chat { mode, conversation } => {
            let mode = parse_mode(mode.as_deref())?.unwrap_or_else(|| client.default_mode());
            cmd_chat(&rt, &client, conversation, mode, input, output)
        }
        Commands::Ask { text, mode, format } => {
            let mode: Mode = mode.parse()?;
            let reply = rt.block_on(client.converse("ask", text, mode));
            write_out(output, &format_reply(&reply, OutputFormat::parse(format)))
        }
    }
}

fn cmd_chat<R: BufRead, W: Write>(
    rt: &tokio::runtime::Runtime,
    client: &GatewayClient,
    conversation: &str,
    mode: Mode,
    input: R,
    output: &mut W,
) -> Result<()> {
    debug!(provider = client.provider_name(), %mode, conversation, "Starting chat");
    write_out(output, &format!("{GREETING}\n"))?;

    for line in input.lines() {
        let line = line.map_err(CommandError::from)?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let response = match ChatCommand::parse(text) {
            Some(ChatCommand::Start) => format!("{GREETING}\n"),
            Some(ChatCommand::Help) => format!("{HELP_TEXT}\n"),
            Some(ChatCommand::Reset) => {
                rt.block_on(client.reset(conversation));
                "Conversation reset.\n".to_string()
            }
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Unknown) => "Unknown command. Type /help for the list.\n".to_string(),
            None => {
                let reply = rt.block_on(client.converse(conversation, text, mode));
                format_reply(&reply, OutputFormat::Text)
            }
        };
        write_out(output, &response)?;
    }
    Ok(())
}

fn write_out<W: Write>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|()| output.flush())
        .map_err(CommandError::from)?;
    Ok(())
}
