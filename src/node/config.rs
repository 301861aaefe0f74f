use crate::messages::Role;

use std::time::Duration;

/// Broadcast topic shared by every node of a network.
pub const DEFAULT_TOPIC: &str = "compute/mesh/general";

/// Static configuration of one node. Fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub role: Role,
    pub topic: String,
    /// How long a head collects roll-call responses.
    pub rollcall_window: Duration,
    /// Close the roll-call window early once this many capable peers answered.
    pub min_responders: Option<usize>,
    /// Default deadline for a caller awaiting an execution result.
    pub request_timeout: Duration,
    /// Age after which a correlation record is evicted.
    pub correlation_ttl: Duration,
    pub sweep_interval: Duration,
    pub health_interval: Duration,
    pub stats_interval: Duration,
    /// Maximum executions/installs running at once.
    pub worker_count: usize,
    /// Jobs allowed to queue behind busy workers. Beyond this an execute is
    /// answered with `NOT_CAPABLE` straight away.
    pub pool_backlog: usize,
    pub mailbox_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: Role::Worker,
            topic: DEFAULT_TOPIC.to_string(),
            rollcall_window: Duration::from_secs(2),
            min_responders: None,
            request_timeout: Duration::from_secs(10),
            correlation_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5),
            health_interval: Duration::from_secs(60),
            stats_interval: Duration::from_secs(30),
            worker_count: 4,
            pool_backlog: 64,
            mailbox_capacity: 256,
        }
    }
}

impl NodeConfig {
    pub fn head() -> Self {
        Self {
            role: Role::Head,
            ..Self::default()
        }
    }

    pub fn worker() -> Self {
        Self::default()
    }

    pub fn is_head(&self) -> bool {
        self.role == Role::Head
    }
}
