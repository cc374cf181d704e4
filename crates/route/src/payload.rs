//! Response payloads produced by handlers and rewritten by interceptors.
//!
//! A [`Payload`] is the structured view of a response body. Handlers return one,
//! the transport only ever sees its serialized bytes, and interceptors get it
//! decoded again so they can work on json values instead of raw text.

use bytes::Bytes;
use http::HeaderValue;
use mime::Mime;
use serde::Serialize;
use serde_json::Value;

/// A response body in its structured form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Bytes(Bytes),
}

impl Payload {
    /// Serializes `value` into a json payload
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Text(text) => text.is_empty(),
            Payload::Json(_) => false,
            Payload::Bytes(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_json_mut(&mut self) -> Option<&mut Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The content type a reply carrying this payload should announce
    pub fn content_type(&self) -> Option<Mime> {
        match self {
            Payload::Empty | Payload::Bytes(_) => None,
            Payload::Text(_) => Some(mime::TEXT_PLAIN_UTF_8),
            Payload::Json(_) => Some(mime::APPLICATION_JSON),
        }
    }

    /// Decodes serialized bytes, json is only attempted when the content type says so
    pub(crate) fn decode(bytes: Bytes, content_type: Option<&HeaderValue>) -> Self {
        if bytes.is_empty() {
            return Payload::Empty;
        }

        if is_json(content_type) {
            if let Ok(value) = serde_json::from_slice(&bytes) {
                return Payload::Json(value);
            }
        }

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Payload::Text(text),
            Err(_) => Payload::Bytes(bytes),
        }
    }

    /// Serializes the payload back into bytes
    pub(crate) fn encode(self) -> Result<Bytes, serde_json::Error> {
        match self {
            Payload::Empty => Ok(Bytes::new()),
            Payload::Text(text) => Ok(Bytes::from(text)),
            Payload::Json(value) => serde_json::to_vec(&value).map(Bytes::from),
            Payload::Bytes(bytes) => Ok(bytes),
        }
    }
}

fn is_json(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|mime| {
            mime.subtype() == mime::JSON || mime.suffix().is_some_and(|suffix| suffix == mime::JSON)
        })
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&'static str> for Payload {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Payload::Empty } else { Payload::Text(value.into()) }
    }
}

impl From<()> for Payload {
    fn from((): ()) -> Self {
        Payload::Empty
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(option: Option<T>) -> Self {
        match option {
            Some(t) => t.into(),
            None => Payload::Empty,
        }
    }
}
