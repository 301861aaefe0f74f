//! Function Handler Registry
//!
//! Maps manifest entry names (e.g., "echo") to executable Rust closures. A function is
//! runnable on this node when its manifest is installed and its entry is registered
//! here, which keeps the sandbox/runtime question out of the coordination engine.

use super::manifest::ManifestStore;
use super::types::*;
use crate::messages::codes;
use crate::transport::BoxFuture;

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a thread-safe, asynchronous function handler.
/// It takes the `Invocation` and resolves to the result payload.
pub type FunctionHandlerFn =
    Arc<dyn Fn(Invocation) -> Pin<Box<dyn Future<Output = Result<String>> + Send>> + Send + Sync>;

/// Registry holding the mapping between entry names and their implementation.
pub struct FunctionRegistry {
    handlers: DashMap<String, FunctionHandlerFn>,
    manifests: Arc<ManifestStore>,
}

impl FunctionRegistry {
    pub fn new(manifests: Arc<ManifestStore>) -> Arc<Self> {
        Arc::new(Self {
            handlers: DashMap::new(),
            manifests,
        })
    }

    /// Registers a handler under an entry name.
    ///
    /// # Arguments
    /// * `entry` - The name manifests refer to in their `entry` field.
    /// * `handler` - The closure that implements the function.
    pub fn register<F, Fut>(&self, entry: &str, handler: F)
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        // Box::pin erases the concrete future type so different handlers share one map.
        let handler_fn: FunctionHandlerFn = Arc::new(move |invocation: Invocation| {
            Box::pin(handler(invocation)) as Pin<Box<dyn Future<Output = Result<String>> + Send>>
        });

        self.handlers.insert(entry.to_string(), handler_fn);

        tracing::info!("Registered function handler: {}", entry);
    }

    pub fn manifests(&self) -> &Arc<ManifestStore> {
        &self.manifests
    }

    pub fn has_handler(&self, entry: &str) -> bool {
        self.handlers.contains_key(entry)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn list_handlers(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Resolves an invocation to its handler, checking the installed manifest first.
    fn resolve(&self, invocation: &Invocation) -> Result<FunctionHandlerFn, RunError> {
        let manifest = self
            .manifests
            .get(&invocation.function_id)
            .ok_or_else(|| RunError::FunctionNotFound(invocation.function_id.clone()))?;

        if !manifest.supports(&invocation.method) {
            return Err(RunError::MethodNotFound {
                function_id: invocation.function_id.clone(),
                method: invocation.method.clone(),
            });
        }

        self.handlers
            .get(&manifest.entry)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RunError::Runtime {
                function_id: invocation.function_id.clone(),
                message: format!("no handler registered for entry '{}'", manifest.entry),
            })
    }
}

impl FunctionRunner for FunctionRegistry {
    fn can_run(&self, function_id: &str) -> bool {
        self.manifests
            .get(function_id)
            .is_some_and(|manifest| self.has_handler(&manifest.entry))
    }

    fn run(&self, invocation: Invocation) -> BoxFuture<'static, Result<RunOutput, RunError>> {
        let resolved = self.resolve(&invocation);

        Box::pin(async move {
            let handler_fn = resolved?;

            tracing::debug!(
                "Running {}::{}",
                invocation.function_id,
                invocation.method
            );

            let function_id = invocation.function_id.clone();
            match handler_fn(invocation).await {
                Ok(result) => Ok(RunOutput {
                    code: codes::OK,
                    result,
                }),
                Err(e) => Err(RunError::Runtime {
                    function_id,
                    message: e.to_string(),
                }),
            }
        })
    }
}
