//! Correlation Store Module
//!
//! Ties asynchronous `execute_response` frames back to the local caller that is
//! waiting for them, keyed by request id.
//!
//! ## Lifecycle of a record
//! 1. **Open**: created by the originator before the request leaves the node.
//! 2. **Completed**: the first matching response (or a roll-call failure) is stored
//!    and any waiter is woken. Later completions for the same id are ignored.
//! 3. **Expired**: a record older than the TTL is evicted by the sweeper, or lazily
//!    when a late response arrives. A waiter whose deadline passes evicts its own record.

pub mod store;
pub mod types;

pub use store::CorrelationStore;
pub use types::{Completion, ExecutionResult, RecordState};
