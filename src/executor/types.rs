use crate::messages::codes;
use crate::transport::BoxFuture;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Description of an installable function, as served at its manifest URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionManifest {
    pub function_id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Name of the registered handler that implements this function.
    pub entry: String,
    /// Methods the function exposes. Empty admits any method.
    #[serde(default)]
    pub methods: Vec<String>,
}

impl FunctionManifest {
    pub fn supports(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }
}

/// A single call into a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function_id: String,
    pub method: String,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub code: i32,
    pub result: String,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("function '{0}' is not installed")]
    FunctionNotFound(String),

    #[error("function '{function_id}' has no method '{method}'")]
    MethodNotFound { function_id: String, method: String },

    #[error("function '{function_id}' failed: {message}")]
    Runtime { function_id: String, message: String },
}

impl RunError {
    /// Result code reported in the `execute_response`.
    pub fn code(&self) -> i32 {
        match self {
            RunError::FunctionNotFound(_) | RunError::MethodNotFound { .. } => codes::NOT_FOUND,
            RunError::Runtime { .. } => codes::EXECUTION_FAILED,
        }
    }
}

/// The function-execution collaborator.
pub trait FunctionRunner: Send + Sync {
    fn can_run(&self, function_id: &str) -> bool;

    fn run(&self, invocation: Invocation) -> BoxFuture<'static, Result<RunOutput, RunError>>;
}

/// The function-install collaborator.
pub trait FunctionInstaller: Send + Sync {
    fn install(&self, manifest_url: String) -> BoxFuture<'static, anyhow::Result<FunctionManifest>>;
}
