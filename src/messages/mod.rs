//! Message Envelope Module
//!
//! Every frame exchanged on the broadcast topic is a JSON object whose `type` field
//! names its kind and fixes the shape of the remaining fields:
//!
//! | kind | fields |
//! |---|---|
//! | `health_ping` | `code` |
//! | `roll_call` | optional `request_id`, `function_id` |
//! | `roll_call_response` | `code`, `role`, optional `request_id`, `function_id` |
//! | `execute` | `function_id`, `method`, optional `request_id` |
//! | `execute_response` | `request_id`, `code`, `result` |
//! | `install_function` | `manifest_url` |
//!
//! `codec::decode` classifies a payload by its tag before parsing the body, so an
//! absent or unknown tag is reported as such instead of as a generic parse failure.

pub mod codec;
pub mod types;

pub use codec::{DecodeError, decode, encode};
pub use types::*;

#[cfg(test)]
mod tests;
