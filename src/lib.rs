//! Peer-to-Peer Compute Node Library
//!
//! This library crate defines the core modules of a compute node. Nodes join a
//! shared overlay as either a **head** (accepts execution requests, discovers capable
//! workers by roll call, correlates their responses) or a **worker** (answers roll
//! calls and runs functions). It serves as the foundation for the binary executable
//! (`main.rs`).
//!
//! ## Architecture Modules
//! - **`messages`**: The wire envelope. A JSON object whose `type` tag selects the
//!   payload shape and the mailbox it is routed to.
//! - **`correlation`**: Maps request ids to pending/completed results with TTL
//!   eviction, so a caller can await the response to its request.
//! - **`rollcall`**: Collection windows over roll-call responses and the pluggable
//!   policy that selects a responder.
//! - **`executor`**: Function manifests, the handler registry, the HTTP installer,
//!   the execution dispatcher and the bounded worker pool.
//! - **`node`**: Mailboxes, the single-threaded coordination loop, health pings and
//!   the handle callers drive a running node with.
//! - **`transport`**: The narrow publish/send/subscribe contract the node consumes,
//!   with an in-process and a UDP gossip implementation.
//! - **`api`**: The HTTP control plane exposed by head nodes.

pub mod api;
pub mod correlation;
pub mod error;
pub mod executor;
pub mod messages;
pub mod node;
pub mod rollcall;
pub mod transport;
