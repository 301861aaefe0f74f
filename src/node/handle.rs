use super::mailbox::{ExecuteRequest, InstallRequest, MailboxSenders, Origin};
use crate::correlation::{CorrelationStore, ExecutionResult};
use crate::error::{CoordinationError, Result};
use crate::messages::{RequestId, Role};
use crate::transport::{PeerId, Transport};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Caller-facing side of a running node.
///
/// Cheap to clone. Requests are queued into the coordination loop like any
/// network message; the handle never touches protocol state itself.
#[derive(Clone)]
pub struct NodeHandle {
    role: Role,
    senders: MailboxSenders,
    correlation: Arc<CorrelationStore>,
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
    shutdown: Arc<watch::Sender<bool>>,
}

impl NodeHandle {
    pub(crate) fn new(
        role: Role,
        senders: MailboxSenders,
        correlation: Arc<CorrelationStore>,
        transport: Arc<dyn Transport>,
        request_timeout: Duration,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            role,
            senders,
            correlation,
            transport,
            request_timeout,
            shutdown,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_peer(&self) -> PeerId {
        self.transport.local_peer()
    }

    pub fn known_peers(&self) -> Vec<PeerId> {
        self.transport.known_peers()
    }

    pub fn correlation(&self) -> &Arc<CorrelationStore> {
        &self.correlation
    }

    /// Executes `function_id`/`method` and waits for the result with the
    /// configured request timeout.
    ///
    /// On a head the request goes through a roll call; on a worker it runs locally.
    pub async fn execute(&self, function_id: &str, method: &str) -> Result<ExecutionResult> {
        self.execute_with_timeout(function_id, method, self.request_timeout)
            .await
    }

    pub async fn execute_with_timeout(
        &self,
        function_id: &str,
        method: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let request_id = RequestId::new();
        self.correlation.open(request_id.clone())?;

        let request = ExecuteRequest {
            origin: Origin::Local,
            request_id: Some(request_id.clone()),
            function_id: function_id.to_string(),
            method: method.to_string(),
        };

        if self.senders.execute.send(request).await.is_err() {
            self.correlation.discard(&request_id);
            return Err(CoordinationError::MailboxClosed("execute"));
        }

        tracing::debug!("Submitted request {} ({}/{})", request_id, function_id, method);

        self.correlation.wait(&request_id, timeout).await
    }

    /// Queues a function install. Completion is reported in the node's log.
    pub async fn install(&self, manifest_url: &str) -> Result<()> {
        self.senders
            .install
            .send(InstallRequest {
                origin: Origin::Local,
                manifest_url: manifest_url.to_string(),
            })
            .await
            .map_err(|_| CoordinationError::MailboxClosed("install_function"))
    }

    /// Signals every node task to stop.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down node {}", self.transport.local_peer());
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
