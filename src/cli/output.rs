//! Output formatting for CLI commands.

use serde::Serialize;

use crate::gateway::Reply;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain reply text.
    #[default]
    Text,
    /// JSON object per reply.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    #[must_use]
    pub fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {e}"}}"#))
    }
}

/// Formats a gateway reply.
#[must_use]
pub fn format_reply(reply: &Reply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{}\n", reply.text()),
        OutputFormat::Json => format!("{}\n", format.to_json(reply)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse(" JSON "), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_format_reply_text() {
        let reply = Reply::Answer {
            text: "hello".to_string(),
        };
        assert_eq!(format_reply(&reply, OutputFormat::Text), "hello\n");
    }

    #[test]
    fn test_format_reply_json() {
        let reply = Reply::Failure {
            kind: FailureKind::NotConfigured,
            message: "not configured".to_string(),
        };
        let out = format_reply(&reply, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "not_configured");
    }
}
