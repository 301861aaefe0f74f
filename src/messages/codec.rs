use super::types::{Envelope, MessageKind};

use serde_json::Value;
use thiserror::Error;

const TAG_FIELD: &str = "type";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no 'type' tag")]
    MissingType,

    #[error("'type' tag is not a string")]
    InvalidType,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("malformed {kind} message: {source}")]
    Malformed {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Serializes an envelope to its wire form.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(envelope)
}

/// Classifies and parses an inbound payload.
///
/// The tag is checked against the known kinds first, so unknown tags are rejected
/// explicitly; only then is the body parsed against the shape the tag names.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::InvalidJson)?;

    let tag = match value.as_object() {
        None => return Err(DecodeError::NotAnObject),
        Some(object) => match object.get(TAG_FIELD) {
            None => return Err(DecodeError::MissingType),
            Some(Value::String(tag)) => tag.clone(),
            Some(_) => return Err(DecodeError::InvalidType),
        },
    };

    let kind = MessageKind::from_tag(&tag).ok_or(DecodeError::UnknownType(tag))?;

    serde_json::from_value(value).map_err(|source| DecodeError::Malformed { kind, source })
}
