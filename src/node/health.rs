use crate::messages::{Envelope, HealthPing, codes, encode};
use crate::transport::Transport;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Periodically announces this node as alive on the node topic.
pub struct HealthMonitor {
    transport: Arc<dyn Transport>,
    topic: String,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(transport: Arc<dyn Transport>, topic: impl Into<String>, interval: Duration) -> Self {
        Self {
            transport,
            topic: topic.into(),
            interval,
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let payload = encode(&Envelope::HealthPing(HealthPing { code: codes::OK }))?;
        self.transport.publish(&self.topic, payload).await
    }

    /// Pings once per interval, the first time immediately. Failures are logged
    /// and the next tick tries again.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.ping().await {
                Ok(()) => tracing::trace!("Health ping published on {}", self.topic),
                Err(e) => tracing::warn!("Health ping failed: {}", e),
            }
        }
    }
}
