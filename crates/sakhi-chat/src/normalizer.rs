//! Reduction of assistant replies to a single display string.
//!
//! The service does not commit to a reply schema. Depending on the route it
//! answers with plain text, a JSON document encoded in a string, an object
//! carrying `message`, or an object whose `response` holds any of the above.
//! Exactly one nested `response` level is unwrapped; anything deeper is shown
//! as-is.

use serde_json::{Map, Value};

/// The shapes a reply payload can take on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// A string, possibly holding an encoded JSON object.
    Text(String),
    /// A structured object.
    Object(Map<String, Value>),
    /// Any other JSON value (array, number, boolean, null).
    Other(Value),
}

impl From<Value> for ResponsePayload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ResponsePayload::Text(text),
            Value::Object(map) => ResponsePayload::Object(map),
            other => ResponsePayload::Other(other),
        }
    }
}

impl From<String> for ResponsePayload {
    fn from(text: String) -> Self {
        ResponsePayload::Text(text)
    }
}

impl From<&str> for ResponsePayload {
    fn from(text: &str) -> Self {
        ResponsePayload::Text(text.to_string())
    }
}

/// Turn any reply payload into display text. Never fails.
pub fn normalize(payload: impl Into<ResponsePayload>) -> String {
    match decode(payload.into()) {
        ResponsePayload::Text(text) => text,
        ResponsePayload::Object(map) => from_object(map),
        ResponsePayload::Other(value) => stringify(&value),
    }
}

/// Promote a string holding an encoded object to the object itself.
fn decode(payload: ResponsePayload) -> ResponsePayload {
    match payload {
        ResponsePayload::Text(text) => match parse_object(&text) {
            Some(map) => ResponsePayload::Object(map),
            None => ResponsePayload::Text(text),
        },
        other => other,
    }
}

fn from_object(map: Map<String, Value>) -> String {
    if let Some(message) = truthy_field(&map, "message") {
        return stringify(message);
    }
    if let Some(candidate) = truthy_field(&map, "response") {
        return unwrap_once(candidate);
    }
    stringify(&Value::Object(map))
}

/// The single extra unwrap pass applied to a `response` candidate.
fn unwrap_once(candidate: &Value) -> String {
    match candidate {
        Value::String(text) => parse_object(text)
            .as_ref()
            .and_then(|inner| truthy_field(inner, "message"))
            .map(stringify)
            .unwrap_or_else(|| text.clone()),
        Value::Object(inner) => match truthy_field(inner, "message") {
            Some(message) => stringify(message),
            None => stringify(candidate),
        },
        other => stringify(other),
    }
}

/// Parse `text` as a JSON object if it looks like one.
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    if !text.trim_start().starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "Reply text looked like JSON but did not parse");
            None
        }
    }
}

fn truthy_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| is_truthy(value))
}

/// Loose truthiness: null, false, zero and the empty string are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strings render verbatim, everything else as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
