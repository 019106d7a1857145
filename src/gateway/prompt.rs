//! Fixed texts: persona prompt, structured-output template, and the
//! user-facing messages the gateway returns on failure.

use crate::error::truncate_at_boundary;

/// Default persona placed at the start of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers users' questions.";

/// Reply when no credential (or endpoint) is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "Sorry, the LLM API is not configured. \
     Please set the LLM_API_KEY environment variable.";

/// Prefix of every handled-failure reply.
pub const FAILURE_PREFIX: &str = "Sorry, an error occurred while processing your request";

/// Maximum byte length of failure detail shown to users.
pub const MAX_FAILURE_DETAIL_LEN: usize = 300;

/// Greeting for the `/start` command.
pub const GREETING: &str = "Hi! I pass your messages to a language model and send back its answer. \
     Just type a message to get started.";

/// Text for the `/help` command.
pub const HELP_TEXT: &str = "Available commands:\n\
     /start - Show the greeting\n\
     /help - Show this help\n\
     /reset - Start a new conversation\n\
     /quit - Exit\n\n\
     Any other message is sent to the language model.";

/// Instruction template for structured mode. `{message}` is replaced with the
/// user text.
const STRUCTURED_TEMPLATE: &str = r#"Answer the user's message below. Respond with ONLY a JSON object, no markdown and no surrounding text, with exactly these fields:

{
  "response": "your full answer to the user",
  "summary": "a one-sentence summary of the answer",
  "keywords": ["3 to 5 keywords"],
  "category": "a single short topic category"
}

User message:
{message}"#;

/// Wraps user text in the structured-output instruction template.
#[must_use]
pub fn build_structured_prompt(message: &str) -> String {
    STRUCTURED_TEMPLATE.replace("{message}", message)
}

/// Formats the user-facing reply for a handled failure.
#[must_use]
pub fn failure_message(detail: &str) -> String {
    let detail = truncate_at_boundary(detail.trim(), MAX_FAILURE_DETAIL_LEN);
    format!("{FAILURE_PREFIX}: {detail}")
}
