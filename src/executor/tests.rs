//! Executor Module Tests
//!
//! This module contains unit and integration tests for the function execution path.
//!
//! ## Test Scopes
//! - **Registry**: Capability checks and handler execution against installed manifests.
//! - **Dispatcher**: Every failure folds into a result code; request ids are preserved.
//! - **Installer**: Fetching manifests from a live HTTP server.
//! - **Pool**: The concurrency bound holds under load and the backlog is finite.

#[cfg(test)]
mod tests {
    use crate::executor::dispatcher::ExecutionDispatcher;
    use crate::executor::installer::HttpInstaller;
    use crate::executor::manifest::ManifestStore;
    use crate::executor::pool::{PoolSaturated, WorkerPool};
    use crate::executor::registry::FunctionRegistry;
    use crate::executor::types::*;
    use crate::messages::{RequestId, codes};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn manifest(function_id: &str, entry: &str, methods: &[&str]) -> FunctionManifest {
        FunctionManifest {
            function_id: function_id.to_string(),
            name: function_id.to_string(),
            version: "1.0.0".to_string(),
            entry: entry.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn echo_registry() -> Arc<FunctionRegistry> {
        let manifests = ManifestStore::new();
        let registry = FunctionRegistry::new(manifests);
        registry.register("echo", |invocation: Invocation| async move {
            Ok(format!("{}:{}", invocation.function_id, invocation.method))
        });
        registry.register("broken", |_invocation: Invocation| async {
            Err(anyhow::anyhow!("Intentional error"))
        });
        registry
    }

    // ============================================================
    // TEST 1: FunctionRegistry - Capability and Execution
    // ============================================================

    #[tokio::test]
    async fn test_registry_can_run_requires_manifest_and_handler() {
        // ARRANGE
        let registry = echo_registry();

        // ASSERT: Handler alone is not enough
        assert!(registry.has_handler("echo"));
        assert!(!registry.can_run("f1"));

        // ACT: Install a manifest pointing at a registered entry
        registry.manifests().insert(manifest("f1", "echo", &[]));
        registry.manifests().insert(manifest("f2", "missing_entry", &[]));

        // ASSERT
        assert!(registry.can_run("f1"));
        assert!(!registry.can_run("f2"));
        assert_eq!(registry.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_registry_runs_handler() {
        let registry = echo_registry();
        registry.manifests().insert(manifest("f1", "echo", &["run"]));

        let output = registry
            .run(Invocation {
                function_id: "f1".to_string(),
                method: "run".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(output.code, codes::OK);
        assert_eq!(output.result, "f1:run");
    }

    #[tokio::test]
    async fn test_registry_rejects_unknown_method() {
        let registry = echo_registry();
        registry.manifests().insert(manifest("f1", "echo", &["run"]));

        let result = registry
            .run(Invocation {
                function_id: "f1".to_string(),
                method: "stop".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RunError::MethodNotFound { .. })));
    }

    #[tokio::test]
    async fn test_registry_handler_can_fail() {
        let registry = echo_registry();
        registry.manifests().insert(manifest("bad", "broken", &[]));

        let result = registry
            .run(Invocation {
                function_id: "bad".to_string(),
                method: "run".to_string(),
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), codes::EXECUTION_FAILED);
        assert!(err.to_string().contains("Intentional error"));
    }

    // ============================================================
    // TEST 2: ExecutionDispatcher - Result Codes
    // ============================================================

    #[tokio::test]
    async fn test_dispatcher_success_keeps_request_id() {
        let registry = echo_registry();
        registry.manifests().insert(manifest("f1", "echo", &[]));
        let dispatcher = ExecutionDispatcher::new(registry);
        let id = RequestId::from("req-9");

        let response = dispatcher.execute(Some(id.clone()), "f1", "run").await;

        assert_eq!(response.request_id, id);
        assert_eq!(response.code, codes::OK);
        assert_eq!(response.result, "f1:run");
    }

    #[tokio::test]
    async fn test_dispatcher_missing_function_is_not_found() {
        let dispatcher = ExecutionDispatcher::new(echo_registry());

        let response = dispatcher.execute(None, "ghost", "run").await;

        assert_eq!(response.code, codes::NOT_FOUND);
        assert!(response.result.contains("ghost"));
        assert!(!response.request_id.0.is_empty());
    }

    #[tokio::test]
    async fn test_dispatcher_handler_error_is_execution_failed() {
        let registry = echo_registry();
        registry.manifests().insert(manifest("bad", "broken", &[]));
        let dispatcher = ExecutionDispatcher::new(registry);

        let response = dispatcher.execute(None, "bad", "run").await;

        assert_eq!(response.code, codes::EXECUTION_FAILED);
    }

    // ============================================================
    // TEST 3: ManifestStore
    // ============================================================

    #[test]
    fn test_manifest_store_replace_and_snapshot() {
        let store = ManifestStore::new();

        assert!(store.insert(manifest("b", "echo", &[])).is_none());
        assert!(store.insert(manifest("a", "echo", &[])).is_none());
        let replaced = store.insert(manifest("a", "other", &[]));

        assert_eq!(replaced.map(|m| m.entry), Some("echo".to_string()));
        let ids: Vec<String> = store.snapshot().into_iter().map(|m| m.function_id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        let restored = ManifestStore::new();
        restored.restore(store.snapshot());
        assert_eq!(restored.len(), 2);
        assert!(restored.contains("b"));
    }

    #[test]
    fn test_manifest_without_methods_supports_any() {
        assert!(manifest("f", "e", &[]).supports("anything"));
        assert!(manifest("f", "e", &["run"]).supports("run"));
        assert!(!manifest("f", "e", &["run"]).supports("stop"));
    }

    // ============================================================
    // TEST 4: HttpInstaller - Live HTTP
    // ============================================================

    async fn serve_manifest(body: serde_json::Value) -> String {
        use axum::{Json, Router, routing::get};

        let app = Router::new().route(
            "/manifest.json",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/manifest.json", addr)
    }

    #[tokio::test]
    async fn test_installer_fetches_and_stores_manifest() {
        // ARRANGE
        let url = serve_manifest(serde_json::json!({
            "function_id": "f1",
            "name": "First",
            "version": "0.1.0",
            "entry": "echo",
            "methods": ["run"]
        }))
        .await;
        let store = ManifestStore::new();
        let installer = HttpInstaller::new(store.clone());

        // ACT
        let installed = installer.install(url).await.unwrap();

        // ASSERT
        assert_eq!(installed.function_id, "f1");
        assert_eq!(store.get("f1"), Some(installed));
    }

    #[tokio::test]
    async fn test_installer_rejects_manifest_without_entry() {
        let url = serve_manifest(serde_json::json!({
            "function_id": "f1",
            "name": "First",
            "entry": ""
        }))
        .await;
        let store = ManifestStore::new();
        let installer = HttpInstaller::new(store.clone());

        let result = installer.install(url).await;

        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_installer_reports_http_errors() {
        let url = serve_manifest(serde_json::json!({}))
            .await
            .replace("manifest.json", "missing.json");
        let installer = HttpInstaller::new(ManifestStore::new());

        let result = installer.install(url).await;

        assert!(result.unwrap_err().to_string().contains("404"));
    }

    // ============================================================
    // TEST 5: WorkerPool - Concurrency Bound
    // ============================================================

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        // ARRANGE
        let pool = WorkerPool::new(2, 4);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        // ACT: Spawn more jobs than workers
        let jobs: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.try_spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        for job in jobs {
            job.await.unwrap();
        }

        // ASSERT
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(pool.idle_workers(), 2);
    }

    #[test]
    fn test_pool_has_at_least_one_worker() {
        assert_eq!(WorkerPool::new(0, 0).worker_count(), 1);
    }

    #[tokio::test]
    async fn test_pool_rejects_beyond_backlog() {
        // ARRANGE: One worker, one queued slot
        let pool = WorkerPool::new(1, 1);

        // ACT: Two jobs that never finish fill the pool
        let first = pool.try_spawn(std::future::pending());
        let second = pool.try_spawn(std::future::pending());
        let third = pool.try_spawn(async {});

        // ASSERT
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(
            third.unwrap_err(),
            PoolSaturated {
                workers: 1,
                backlog: 1
            }
        );
        assert_eq!(pool.pending_jobs(), 2);
    }

    #[tokio::test]
    async fn test_pool_admits_again_after_job_finishes() {
        // ARRANGE
        let pool = WorkerPool::new(1, 0);
        let job = pool.try_spawn(async {}).unwrap();
        assert!(pool.try_spawn(async {}).is_err());

        // ACT
        job.await.unwrap();

        // ASSERT
        assert_eq!(pool.pending_jobs(), 0);
        assert!(pool.try_spawn(async {}).is_ok());
    }
}
