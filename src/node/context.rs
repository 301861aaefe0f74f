use super::config::NodeConfig;
use crate::correlation::CorrelationStore;
use crate::executor::dispatcher::ExecutionDispatcher;
use crate::executor::types::FunctionInstaller;
use crate::rollcall::SelectionPolicy;
use crate::transport::Transport;

use std::sync::Arc;

/// Everything a node's components need, handed to each of them at construction.
#[derive(Clone)]
pub struct NodeContext {
    pub config: Arc<NodeConfig>,
    pub transport: Arc<dyn Transport>,
    pub correlation: Arc<CorrelationStore>,
    pub dispatcher: Arc<ExecutionDispatcher>,
    pub installer: Arc<dyn FunctionInstaller>,
    pub policy: Arc<dyn SelectionPolicy>,
}

impl NodeContext {
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        dispatcher: Arc<ExecutionDispatcher>,
        installer: Arc<dyn FunctionInstaller>,
        policy: Arc<dyn SelectionPolicy>,
    ) -> Self {
        let correlation = CorrelationStore::new(config.correlation_ttl);
        Self {
            config: Arc::new(config),
            transport,
            correlation,
            dispatcher,
            installer,
            policy,
        }
    }
}
