use super::protocol::*;
use crate::error::CoordinationError;
use crate::messages::codes;
use crate::node::NodeHandle;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { alive: true }))
}

pub async fn handle_install_function(
    Extension(node): Extension<Arc<NodeHandle>>,
    Json(req): Json<InstallFunctionRequest>,
) -> (StatusCode, Json<InstallFunctionResponse>) {
    if req.uri.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(InstallFunctionResponse {
                accepted: false,
                error: Some("uri must not be empty".to_string()),
            }),
        );
    }

    match node.install(&req.uri).await {
        Ok(()) => {
            tracing::info!("Install of {} queued", req.uri);
            (
                StatusCode::ACCEPTED,
                Json(InstallFunctionResponse {
                    accepted: true,
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Failed to queue install of {}: {}", req.uri, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(InstallFunctionResponse {
                    accepted: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_execute_function(
    Extension(node): Extension<Arc<NodeHandle>>,
    Json(req): Json<ExecuteFunctionRequest>,
) -> (StatusCode, Json<ExecuteFunctionResponse>) {
    match node.execute(&req.function_id, &req.method).await {
        Ok(result) => (
            StatusCode::OK,
            Json(ExecuteFunctionResponse {
                request_id: Some(result.request_id),
                code: result.code,
                result: result.result,
                peer: result.peer,
                error: None,
            }),
        ),
        Err(e) => {
            let (status, code, request_id) = match &e {
                CoordinationError::NoCapablePeer { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, codes::NOT_CAPABLE, None)
                }
                CoordinationError::Timeout(id) => {
                    (StatusCode::GATEWAY_TIMEOUT, codes::EXECUTION_FAILED, Some(id.clone()))
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::EXECUTION_FAILED,
                    None,
                ),
            };

            tracing::warn!(
                "Execution of {}/{} failed: {}",
                req.function_id,
                req.method,
                e
            );

            (
                status,
                Json(ExecuteFunctionResponse {
                    request_id,
                    code,
                    result: String::new(),
                    peer: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
