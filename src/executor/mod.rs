//! Function Execution Module
//!
//! Everything between "run method M of function F" and an `execute_response`.
//!
//! ## Architecture Overview
//! 1. **Install**: `HttpInstaller` fetches a `FunctionManifest` from a URL and writes it
//!    into the `ManifestStore`, keyed by function id.
//! 2. **Capability**: `FunctionRegistry` can run a function when its manifest is
//!    installed and a handler is registered for the manifest's `entry`.
//! 3. **Dispatch**: `ExecutionDispatcher` invokes the runner and folds every failure
//!    (missing function, unknown method, handler error) into a non-zero result code,
//!    so a response is always produced and correlation always completes.
//! 4. **Offload**: `WorkerPool` bounds how many executions and installs run at once,
//!    keeping slow jobs off the coordination loop.
//!
//! ## Submodules
//! - **`types`**: Manifest, invocation and result types plus the collaborator traits.
//! - **`manifest`**: Local store of installed manifests.
//! - **`registry`**: Maps manifest entry names to executable Rust closures.
//! - **`installer`**: HTTP manifest fetcher with retry and backoff.
//! - **`dispatcher`**: Wraps runner output into the wire response shape.
//! - **`pool`**: Semaphore-bounded job spawner.

pub mod dispatcher;
pub mod installer;
pub mod manifest;
pub mod pool;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
