//! Structured-output recovery.
//!
//! Models often wrap requested JSON in prose or markdown fences even when
//! told not to. [`extract`] runs an ordered list of increasingly loose
//! strategies and stops at the first one that yields a payload.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseFailure;

/// Field names recognized in a structured reply.
const KNOWN_FIELDS: [&str; 4] = ["response", "summary", "keywords", "category"];

/// A fenced block with an optional `json` tag containing an object.
static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?\s*(\{.*?\})\s*```").ok());

/// First `{` through last `}`.
static GREEDY_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// The shape requested in structured mode.
///
/// Any field may be missing when the model only partially complied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPayload {
    /// Full answer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// One-sentence summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Topic keywords, in model order.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Topic category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl StructuredPayload {
    /// Builds a payload from a JSON object, tolerating loose field types.
    ///
    /// Returns `None` unless the value is an object with at least one
    /// recognized field.
    #[must_use]
    pub fn from_object(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if !KNOWN_FIELDS.iter().any(|f| object.contains_key(*f)) {
            return None;
        }
        Some(Self {
            response: text_field(object, "response"),
            summary: text_field(object, "summary"),
            keywords: keywords_field(object),
            category: text_field(object, "category"),
        })
    }

    /// Serializes the payload as pretty-printed JSON.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn keywords_field(object: &Map<String, Value>) -> Vec<String> {
    match object.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        // "a, b, c"
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// A named extraction step.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    /// Tag used in logs.
    pub name: &'static str,
    /// Pure extraction function.
    pub apply: fn(&str) -> Option<StructuredPayload>,
}

/// Extraction strategies, strictest first.
pub const STRATEGIES: [Extractor; 3] = [
    Extractor {
        name: "direct",
        apply: parse_direct,
    },
    Extractor {
        name: "fenced",
        apply: parse_fenced,
    },
    Extractor {
        name: "greedy",
        apply: parse_greedy,
    },
];

/// Parses the whole text as a JSON object.
fn parse_direct(raw: &str) -> Option<StructuredPayload> {
    parse_object(raw)
}

/// Parses the first fenced code block that holds a payload.
fn parse_fenced(raw: &str) -> Option<StructuredPayload> {
    FENCED_BLOCK
        .as_ref()?
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_object(m.as_str()))
}

/// Parses the widest `{ ... }` span in the text.
fn parse_greedy(raw: &str) -> Option<StructuredPayload> {
    let m = GREEDY_OBJECT.as_ref()?.find(raw)?;
    parse_object(m.as_str())
}

fn parse_object(text: &str) -> Option<StructuredPayload> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    StructuredPayload::from_object(&value)
}

/// Runs [`STRATEGIES`] in order and returns the first payload with the
/// name of the strategy that produced it.
///
/// # Errors
///
/// Returns [`ParseFailure`] holding the unchanged input when no strategy
/// succeeds.
pub fn extract_tagged(raw: &str) -> Result<(&'static str, StructuredPayload), ParseFailure> {
    STRATEGIES
        .iter()
        .find_map(|s| (s.apply)(raw).map(|payload| (s.name, payload)))
        .ok_or_else(|| ParseFailure {
            raw: raw.to_string(),
        })
}

/// Extracts a [`StructuredPayload`] from free-form model output.
///
/// # Errors
///
/// Returns [`ParseFailure`] holding the unchanged input when no strategy
/// succeeds.
pub fn extract(raw: &str) -> Result<StructuredPayload, ParseFailure> {
    extract_tagged(raw).map(|(_, payload)| payload)
}
