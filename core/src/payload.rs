//! Payload encoding and the authenticated context.
//!
//! Payloads are JSON objects. An absent or empty payload is encoded as the
//! single character [`EMPTY_SENTINEL`] instead of `{}` to keep tokens short.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::IssueError;

/// Token payload: a JSON object.
pub type Payload = Map<String, Value>;

/// Plaintext standing in for an empty payload.
pub const EMPTY_SENTINEL: &str = "`";

/// Serialize a payload to token plaintext.
pub fn encode(payload: Option<&Payload>) -> String {
    match payload {
        Some(map) if !map.is_empty() => Value::Object(map.clone()).to_string(),
        _ => EMPTY_SENTINEL.to_owned(),
    }
}

/// Parse token plaintext back into a payload.
///
/// Returns `None` when the plaintext is neither the sentinel nor a JSON object.
pub fn decode(plaintext: &str) -> Option<Payload> {
    if plaintext == EMPTY_SENTINEL {
        return Some(Payload::new());
    }
    match serde_json::from_str::<Value>(plaintext) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Convert a typed value into a payload.
///
/// `null` maps to the empty payload.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Payload, IssueError> {
    match serde_json::to_value(value).map_err(|e| IssueError::Serialize(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Payload::new()),
        Value::Bool(_) => Err(IssueError::NotAnObject("boolean")),
        Value::Number(_) => Err(IssueError::NotAnObject("number")),
        Value::String(_) => Err(IssueError::NotAnObject("string")),
        Value::Array(_) => Err(IssueError::NotAnObject("array")),
    }
}

/// Decoded payload attached to one authenticated request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    payload: Payload,
}

impl AuthContext {
    /// Wrap a decoded payload.
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    /// The decoded payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Look up a single payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Whether the token carried an empty payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Deserialize the payload into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }

    /// Unwrap into the raw payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

impl From<Payload> for AuthContext {
    fn from(payload: Payload) -> Self {
        Self::new(payload)
    }
}
