//! HTTP control plane of a head node.
//!
//! | Method | Path                | Body                          |
//! |--------|---------------------|-------------------------------|
//! | GET    | `/health`           |                               |
//! | POST   | `/function/install` | `{"uri": ...}`                |
//! | POST   | `/function/execute` | `{"function_id", "method"}`   |

pub mod handlers;
pub mod protocol;

use crate::node::NodeHandle;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn router(node: Arc<NodeHandle>) -> Router {
    Router::new()
        .route(protocol::HEALTH, get(handlers::handle_health))
        .route(
            protocol::INSTALL_FUNCTION,
            post(handlers::handle_install_function),
        )
        .route(
            protocol::EXECUTE_FUNCTION,
            post(handlers::handle_execute_function),
        )
        .layer(Extension(node))
}
