//! Peer Transport Module
//!
//! The coordination engine only needs four things from the network: who am I,
//! publish bytes on a topic, send bytes to one peer, and a feed of inbound frames
//! and discovered peers. This module defines that contract and ships two
//! implementations of it.
//!
//! ## Implementations
//! - **`memory`**: An in-process hub. Every `MemoryTransport` joined to the same
//!   `MemoryNetwork` sees every other one. Used by tests and single-process demos.
//! - **`gossip`**: A UDP gossip transport (inspired by SWIM). Nodes join through seed
//!   addresses, exchange member lists, detect failures with a Suspect -> Dead model and
//!   fan topic publishes out to every alive member.

pub mod gossip;
pub mod memory;
pub mod types;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

pub use types::PeerId;

/// Type-erased future returned by transport operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A raw payload delivered by the transport together with the identity of its sender.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub from: PeerId,
    pub payload: Vec<u8>,
}

/// The narrow contract the node consumes from the peer overlay.
///
/// Delivery is best effort. Implementations never deliver a node's own publishes
/// back to it. Frames sent directly with `send_to` arrive on every subscription the
/// receiving node holds.
pub trait Transport: Send + Sync + 'static {
    /// Identity of this node on the overlay.
    fn local_peer(&self) -> PeerId;

    /// Broadcasts `payload` to every peer subscribed to `topic`.
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    /// Sends `payload` to a single peer.
    fn send_to<'a>(&'a self, peer: &'a PeerId, payload: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    /// Starts receiving frames published on `topic` (and frames sent directly to us).
    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<InboundFrame>;

    /// Feed of peers as they are discovered. Peers already known are replayed first.
    fn discover_peers(&self, topic: &str) -> mpsc::UnboundedReceiver<PeerId>;

    /// Snapshot of currently reachable peers (excluding ourselves).
    fn known_peers(&self) -> Vec<PeerId>;
}

#[cfg(test)]
mod tests;
