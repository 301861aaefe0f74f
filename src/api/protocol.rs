use crate::messages::RequestId;
use crate::transport::PeerId;

use serde::{Deserialize, Serialize};

pub const HEALTH: &str = "/health";
pub const INSTALL_FUNCTION: &str = "/function/install";
pub const EXECUTE_FUNCTION: &str = "/function/execute";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallFunctionRequest {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallFunctionResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteFunctionRequest {
    pub function_id: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub code: i32,
    pub result: String,
    /// Worker that ran the function, if it ran remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
