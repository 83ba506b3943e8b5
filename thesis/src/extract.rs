//! Picks the best available research text out of a loosely structured
//! response.
//!
//! Candidates, first match wins:
//! 1. `final_result`
//! 2. `content`
//! 3. `result`
//! 4. the most recent `messages` entry with `role == "assistant"` and
//!    non-empty `content`
//! 5. `raw_response`
//! 6. a placeholder naming the original query
//!
//! Keys 1, 2, 3 and 5 win as soon as they are present, even with an empty
//! string. A JSON `null` counts as absent. Non-string values are rendered as
//! compact JSON.

use crate::payload::Payload;
use serde_json::{Map, Value};

const RESULT_KEYS: [&str; 3] = ["final_result", "content", "result"];

pub fn placeholder(query: &str) -> String {
    format!(
        "Research query: {}\nNo research content found in response.",
        query
    )
}

pub fn extract(payload: &Map<String, Value>, fallback_query: &str) -> String {
    find_content(payload).unwrap_or_else(|| placeholder(fallback_query))
}

/// Candidates 1 to 5 only: `None` where [`extract`] would fall back to the
/// placeholder.
pub fn find_content(payload: &Map<String, Value>) -> Option<String> {
    RESULT_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(text_of))
        .or_else(|| last_assistant_message(payload))
        .or_else(|| payload.get("raw_response").and_then(text_of))
}

/// [`extract`] over every payload shape. Text bodies are taken verbatim.
pub fn extract_payload(payload: &Payload, fallback_query: &str) -> String {
    match payload {
        Payload::Json(map) => extract(map, fallback_query),
        Payload::Text(text) if !text.is_empty() => text.clone(),
        Payload::Text(_) | Payload::Absent => placeholder(fallback_query),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn last_assistant_message(payload: &Map<String, Value>) -> Option<String> {
    payload
        .get("messages")?
        .as_array()?
        .iter()
        .rev()
        .filter(|message| message.get("role").and_then(Value::as_str) == Some("assistant"))
        .find_map(|message| {
            message
                .get("content")
                .and_then(text_of)
                .filter(|content| !content.is_empty())
        })
}
