//! In-process transport.
//!
//! A `MemoryNetwork` is a shared hub; every `MemoryTransport` joined to it behaves like
//! a peer on a fully connected overlay with instant, lossless delivery.

use super::{BoxFuture, InboundFrame, PeerId, Transport};

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct PeerSlot {
    /// Topic -> subscribers.
    subscriptions: DashMap<String, Vec<mpsc::UnboundedSender<InboundFrame>>>,
    /// Topic -> discovery listeners.
    discovery: DashMap<String, Vec<mpsc::UnboundedSender<PeerId>>>,
}

impl PeerSlot {
    fn deliver(&self, topic: Option<&str>, frame: &InboundFrame) {
        for mut entry in self.subscriptions.iter_mut() {
            if topic.is_some_and(|t| t != entry.key().as_str()) {
                continue;
            }
            entry
                .value_mut()
                .retain(|subscriber| subscriber.send(frame.clone()).is_ok());
        }
    }

    fn announce(&self, peer: &PeerId) {
        for mut entry in self.discovery.iter_mut() {
            entry
                .value_mut()
                .retain(|listener| listener.send(peer.clone()).is_ok());
        }
    }
}

/// Shared hub connecting every in-process peer.
#[derive(Default)]
pub struct MemoryNetwork {
    peers: DashMap<PeerId, Arc<PeerSlot>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a new peer to the network and announces it to everyone already there.
    pub fn join(self: &Arc<Self>) -> Arc<MemoryTransport> {
        let id = PeerId::new();

        for entry in self.peers.iter() {
            entry.value().announce(&id);
        }
        self.peers.insert(id.clone(), Arc::new(PeerSlot::default()));

        tracing::debug!("Peer {} joined memory network ({} peers)", id, self.peers.len());

        Arc::new(MemoryTransport {
            id,
            network: self.clone(),
        })
    }

    /// Removes a peer. Frames addressed to it are refused afterwards.
    pub fn leave(&self, peer: &PeerId) {
        self.peers.remove(peer);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn slot(&self, peer: &PeerId) -> Option<Arc<PeerSlot>> {
        self.peers.get(peer).map(|entry| entry.value().clone())
    }
}

/// One peer's handle onto a `MemoryNetwork`.
pub struct MemoryTransport {
    id: PeerId,
    network: Arc<MemoryNetwork>,
}

impl Transport for MemoryTransport {
    fn local_peer(&self) -> PeerId {
        self.id.clone()
    }

    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let frame = InboundFrame {
                from: self.id.clone(),
                payload,
            };

            let targets: Vec<Arc<PeerSlot>> = self
                .network
                .peers
                .iter()
                .filter(|entry| entry.key() != &self.id)
                .map(|entry| entry.value().clone())
                .collect();

            for slot in targets {
                slot.deliver(Some(topic), &frame);
            }

            Ok(())
        })
    }

    fn send_to<'a>(&'a self, peer: &'a PeerId, payload: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let slot = self
                .network
                .slot(peer)
                .ok_or_else(|| anyhow::anyhow!("Unknown peer: {}", peer))?;

            slot.deliver(
                None,
                &InboundFrame {
                    from: self.id.clone(),
                    payload,
                },
            );

            Ok(())
        })
    }

    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<InboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(slot) = self.network.slot(&self.id) {
            slot.subscriptions
                .entry(topic.to_string())
                .or_default()
                .push(tx);
        }

        rx
    }

    fn discover_peers(&self, topic: &str) -> mpsc::UnboundedReceiver<PeerId> {
        let (tx, rx) = mpsc::unbounded_channel();

        for peer in self.known_peers() {
            let _ = tx.send(peer);
        }

        if let Some(slot) = self.network.slot(&self.id) {
            slot.discovery.entry(topic.to_string()).or_default().push(tx);
        }

        rx
    }

    fn known_peers(&self) -> Vec<PeerId> {
        self.network
            .peers
            .iter()
            .filter(|entry| entry.key() != &self.id)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
