//! Per-kind inbound queues and the router that fills them.

use crate::error::CoordinationError;
use crate::messages::{
    Envelope, ExecuteResponse, HealthPing, MessageKind, RequestId, RollCall, RollCallResponse,
    decode,
};
use crate::transport::{InboundFrame, PeerId};

use tokio::sync::mpsc;

/// A decoded message and the peer it came from.
#[derive(Debug, Clone)]
pub struct Inbound<T> {
    pub from: PeerId,
    pub message: T,
}

/// Where a request entered the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Submitted through the control plane of this node.
    Local,
    /// Received from a peer over the network.
    Peer(PeerId),
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub origin: Origin,
    pub request_id: Option<RequestId>,
    pub function_id: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub origin: Origin,
    pub manifest_url: String,
}

/// Producer side of every mailbox. Shared by the network router and the control plane.
#[derive(Clone)]
pub struct MailboxSenders {
    pub install: mpsc::Sender<InstallRequest>,
    pub roll_call: mpsc::Sender<Inbound<RollCall>>,
    pub roll_call_response: mpsc::Sender<Inbound<RollCallResponse>>,
    pub execute: mpsc::Sender<ExecuteRequest>,
    pub execute_response: mpsc::Sender<Inbound<ExecuteResponse>>,
    pub health: mpsc::Sender<Inbound<HealthPing>>,
}

/// Consumer side, owned by the coordination loop.
pub struct MailboxReceivers {
    pub install: mpsc::Receiver<InstallRequest>,
    pub roll_call: mpsc::Receiver<Inbound<RollCall>>,
    pub roll_call_response: mpsc::Receiver<Inbound<RollCallResponse>>,
    pub execute: mpsc::Receiver<ExecuteRequest>,
    pub execute_response: mpsc::Receiver<Inbound<ExecuteResponse>>,
    pub health: mpsc::Receiver<Inbound<HealthPing>>,
}

pub fn mailboxes(capacity: usize) -> (MailboxSenders, MailboxReceivers) {
    let capacity = capacity.max(1);
    let (install_tx, install_rx) = mpsc::channel(capacity);
    let (roll_call_tx, roll_call_rx) = mpsc::channel(capacity);
    let (roll_call_response_tx, roll_call_response_rx) = mpsc::channel(capacity);
    let (execute_tx, execute_rx) = mpsc::channel(capacity);
    let (execute_response_tx, execute_response_rx) = mpsc::channel(capacity);
    let (health_tx, health_rx) = mpsc::channel(capacity);

    (
        MailboxSenders {
            install: install_tx,
            roll_call: roll_call_tx,
            roll_call_response: roll_call_response_tx,
            execute: execute_tx,
            execute_response: execute_response_tx,
            health: health_tx,
        },
        MailboxReceivers {
            install: install_rx,
            roll_call: roll_call_rx,
            roll_call_response: roll_call_response_rx,
            execute: execute_rx,
            execute_response: execute_response_rx,
            health: health_rx,
        },
    )
}

impl MailboxSenders {
    /// Places a decoded envelope into the mailbox for its kind.
    pub async fn route(&self, from: PeerId, envelope: Envelope) -> Result<(), CoordinationError> {
        let kind = envelope.kind();
        let delivered = match envelope {
            Envelope::HealthPing(message) => self
                .health
                .send(Inbound { from, message })
                .await
                .is_ok(),
            Envelope::RollCall(message) => self
                .roll_call
                .send(Inbound { from, message })
                .await
                .is_ok(),
            Envelope::RollCallResponse(message) => self
                .roll_call_response
                .send(Inbound { from, message })
                .await
                .is_ok(),
            Envelope::ExecuteResponse(message) => self
                .execute_response
                .send(Inbound { from, message })
                .await
                .is_ok(),
            Envelope::Execute(message) => self
                .execute
                .send(ExecuteRequest {
                    origin: Origin::Peer(from),
                    request_id: message.request_id,
                    function_id: message.function_id,
                    method: message.method,
                })
                .await
                .is_ok(),
            Envelope::InstallFunction(message) => self
                .install
                .send(InstallRequest {
                    origin: Origin::Peer(from),
                    manifest_url: message.manifest_url,
                })
                .await
                .is_ok(),
        };

        if delivered {
            Ok(())
        } else {
            Err(CoordinationError::MailboxClosed(kind.tag()))
        }
    }

    /// Decodes a raw frame and routes it. Returns the kind that was routed.
    pub async fn route_frame(&self, frame: InboundFrame) -> Result<MessageKind, CoordinationError> {
        let envelope = decode(&frame.payload)?;
        let kind = envelope.kind();
        self.route(frame.from, envelope).await?;
        Ok(kind)
    }
}

/// Feeds frames from the transport into the mailboxes until either side goes away.
///
/// Undecodable frames are logged and dropped; they never reach protocol state.
pub async fn inbound_listener(
    mut frames: mpsc::UnboundedReceiver<InboundFrame>,
    senders: MailboxSenders,
) {
    while let Some(frame) = frames.recv().await {
        let from = frame.from.clone();
        match senders.route_frame(frame).await {
            Ok(kind) => tracing::trace!("Routed {} from {}", kind, from),
            Err(CoordinationError::MailboxClosed(kind)) => {
                tracing::info!("{} mailbox closed, stopping inbound listener", kind);
                break;
            }
            Err(e) => tracing::warn!("Dropping frame from {}: {}", from, e),
        }
    }

    tracing::debug!("Inbound listener stopped");
}
