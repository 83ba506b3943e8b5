use serde_json::{Map, Value};

/// One response body from the research service, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON object.
    Json(Map<String, Value>),
    /// Anything else the service sent back with a success status: non-JSON
    /// text, a JSON string (unquoted), or other JSON that is not an object.
    Text(String),
    /// No usable response at all (error status or transport failure).
    Absent,
}

impl Payload {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Payload::Json(map),
            Ok(Value::String(text)) => Payload::Text(text),
            _ => Payload::Text(body.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Json(map) => Some(map),
            _ => None,
        }
    }
}
