//! CLI layer for the gateway.
//!
//! A terminal chat front-end built with clap: `chat` for an interactive
//! session and `ask` for one-shot questions.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
