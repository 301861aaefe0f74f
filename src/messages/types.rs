use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result codes carried by `health_ping`, `roll_call_response` and `execute_response`.
pub mod codes {
    pub const OK: i32 = 0;
    pub const NOT_FOUND: i32 = 404;
    pub const EXECUTION_FAILED: i32 = 500;
    pub const NOT_CAPABLE: i32 = 503;
}

/// Correlation key for one execution, generated by the node that originates it.
///
/// Wrapper around a UUID v4 string, so collisions between in-flight requests are
/// practically impossible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The part a node plays in the network. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Originates tasks: serves the control plane and runs roll calls.
    Head,
    /// Executes tasks on behalf of heads.
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Head => "head",
            Role::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "head" => Ok(Role::Head),
            "worker" => Ok(Role::Worker),
            other => Err(format!("unknown role '{}', expected 'head' or 'worker'", other)),
        }
    }
}

/// The closed set of message kinds, keyed by their wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    HealthPing,
    Execute,
    ExecuteResponse,
    RollCall,
    RollCallResponse,
    InstallFunction,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::HealthPing,
        MessageKind::Execute,
        MessageKind::ExecuteResponse,
        MessageKind::RollCall,
        MessageKind::RollCallResponse,
        MessageKind::InstallFunction,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::HealthPing => "health_ping",
            MessageKind::Execute => "execute",
            MessageKind::ExecuteResponse => "execute_response",
            MessageKind::RollCall => "roll_call",
            MessageKind::RollCallResponse => "roll_call_response",
            MessageKind::InstallFunction => "install_function",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Periodic liveness advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPing {
    pub code: i32,
}

/// Request to run `method` of an installed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execute {
    pub function_id: String,
    pub method: String,
    /// Set by the originating head; generated by the executor when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

/// Outcome of an `Execute`, correlated by `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub request_id: RequestId,
    pub code: i32,
    pub result: String,
}

/// Capability query broadcast by a head: "who can run this function?".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Empty means any function.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function_id: String,
}

/// A worker's answer to a `RollCall`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCallResponse {
    pub code: i32,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function_id: String,
}

/// Ask a node to fetch and install a function manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallFunction {
    pub manifest_url: String,
}

/// A typed, tagged network message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    HealthPing(HealthPing),
    Execute(Execute),
    ExecuteResponse(ExecuteResponse),
    RollCall(RollCall),
    RollCallResponse(RollCallResponse),
    InstallFunction(InstallFunction),
}

impl Envelope {
    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::HealthPing(_) => MessageKind::HealthPing,
            Envelope::Execute(_) => MessageKind::Execute,
            Envelope::ExecuteResponse(_) => MessageKind::ExecuteResponse,
            Envelope::RollCall(_) => MessageKind::RollCall,
            Envelope::RollCallResponse(_) => MessageKind::RollCallResponse,
            Envelope::InstallFunction(_) => MessageKind::InstallFunction,
        }
    }
}
