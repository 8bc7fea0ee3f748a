//! JSON-like payload tree carried by queue items.
//!
//! Modeled as an explicit variant type so the bounding pass can walk it
//! without re-inspecting dynamic values at every node.

pub mod bounded_encoder;

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Leaf values that are never reduced by bounding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
}

/// A node of an arbitrary JSON-like document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Scalar(Scalar),
    Text(String),
    Sequence(Vec<Payload>),
    Mapping(BTreeMap<String, Payload>),
}

impl Payload {
    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Length in bytes of the compact JSON encoding (the size of the text frame)
    pub fn encoded_len(&self) -> usize {
        encoded_len_of(self)
    }
}

/// Compact JSON length of any serializable value, without building the text
pub(crate) fn encoded_len_of<T: Serialize + ?Sized>(value: &T) -> usize {
    let mut counter = ByteCounter(0);
    // Keys are strings and numbers are finite, so the writer never sees an error.
    let _ = serde_json::to_writer(&mut counter, value);
    counter.0
}

impl Default for Payload {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => Self::Mapping(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Scalar(Scalar::Null) => Value::Null,
            Payload::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Payload::Scalar(Scalar::Number(n)) => Value::Number(n),
            Payload::Text(s) => Value::String(s),
            Payload::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Payload::Mapping(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Sink that only counts bytes
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
