//! Error taxonomy of the coordination engine.
//!
//! Handler-level failures are logged by the coordination loop and never stop it.
//! The variants here are the ones that reach a caller awaiting a result.

use crate::messages::{DecodeError, RequestId};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("failed to decode message: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request {0} is already in flight")]
    DuplicateRequest(RequestId),

    #[error("request {0} is not known to the correlation store")]
    UnknownRequest(RequestId),

    #[error("no capable peer answered the roll call for function '{function_id}'")]
    NoCapablePeer { function_id: String },

    #[error("timed out waiting for the response to request {0}")]
    Timeout(RequestId),

    #[error("{0} mailbox is closed")]
    MailboxClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, CoordinationError>;
