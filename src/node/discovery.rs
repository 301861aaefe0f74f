//! Background observers of the overlay: discovered peers and periodic stats.

use crate::correlation::CorrelationStore;
use crate::transport::{PeerId, Transport};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Logs every peer the first time it is discovered on the topic.
pub async fn log_discovered_peers(mut peers: mpsc::UnboundedReceiver<PeerId>, topic: String) {
    let mut seen = HashSet::new();

    while let Some(peer) = peers.recv().await {
        if seen.insert(peer.clone()) {
            tracing::info!("Discovered peer {} on {}", peer, topic);
        }
    }

    tracing::debug!("Peer discovery feed closed");
}

pub async fn report_stats(
    transport: Arc<dyn Transport>,
    correlation: Arc<CorrelationStore>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        let peers = transport.known_peers();
        tracing::info!(
            "Node stats: {} known peers, {} pending requests",
            peers.len(),
            correlation.len()
        );
        for peer in peers {
            tracing::debug!("  - {}", peer);
        }
    }
}
