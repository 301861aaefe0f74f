use super::types::{FunctionRunner, Invocation};
use crate::messages::{ExecuteResponse, RequestId};

use std::sync::Arc;

/// Runs an execute request against the local function runner.
///
/// Never fails at the transport level: a missing function, an unknown method or a
/// handler error all come back as a non-zero `code` in a valid response.
pub struct ExecutionDispatcher {
    runner: Arc<dyn FunctionRunner>,
}

impl ExecutionDispatcher {
    pub fn new(runner: Arc<dyn FunctionRunner>) -> Arc<Self> {
        Arc::new(Self { runner })
    }

    pub fn can_run(&self, function_id: &str) -> bool {
        self.runner.can_run(function_id)
    }

    /// Executes `method` of `function_id`. A request id is generated when none is given.
    pub async fn execute(
        &self,
        request_id: Option<RequestId>,
        function_id: &str,
        method: &str,
    ) -> ExecuteResponse {
        let request_id = request_id.unwrap_or_default();

        let outcome = self
            .runner
            .run(Invocation {
                function_id: function_id.to_string(),
                method: method.to_string(),
            })
            .await;

        match outcome {
            Ok(output) => {
                tracing::info!(
                    "Request {} ran {}::{} (code {})",
                    request_id,
                    function_id,
                    method,
                    output.code
                );
                ExecuteResponse {
                    request_id,
                    code: output.code,
                    result: output.result,
                }
            }
            Err(e) => {
                tracing::warn!("Request {} failed: {}", request_id, e);
                ExecuteResponse {
                    request_id,
                    code: e.code(),
                    result: e.to_string(),
                }
            }
        }
    }
}
