//! The coordination loop.
//!
//! One task owns every piece of protocol state (roll-call sessions, pending
//! dispatches). It waits on all mailboxes at once and runs exactly one handler to
//! completion per received item, so state transitions are strictly ordered.
//! Slow work (function runs, installs) goes to the worker pool and comes back as a
//! `LoopEvent` on the internal mailbox.

use super::context::NodeContext;
use super::mailbox::{ExecuteRequest, Inbound, InstallRequest, MailboxReceivers, Origin};
use crate::correlation::{Completion, ExecutionResult, RecordState};
use crate::executor::pool::WorkerPool;
use crate::executor::types::FunctionManifest;
use crate::messages::{
    Envelope, Execute, ExecuteResponse, HealthPing, RequestId, Role, RollCall, RollCallResponse,
    codes, encode,
};
use crate::rollcall::{RollCallSession, SelectionPolicy, SessionOutcome};
use crate::transport::PeerId;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Work finished off-loop, delivered back for single-writer handling.
#[derive(Debug)]
pub(crate) enum LoopEvent {
    WindowClosed(RequestId),
    ExecutionFinished {
        origin: Origin,
        response: ExecuteResponse,
    },
    InstallFinished {
        origin: Origin,
        manifest_url: String,
        outcome: std::result::Result<FunctionManifest, String>,
    },
}

/// Head-only roll-call state. Workers are built without one.
struct RollCallInitiator {
    sessions: HashMap<RequestId, RollCallSession>,
    policy: Arc<dyn SelectionPolicy>,
    window: Duration,
    min_responders: Option<usize>,
}

/// Mutable state of the loop, separated from the receivers it waits on.
struct LoopState {
    ctx: NodeContext,
    pool: WorkerPool,
    events: mpsc::UnboundedSender<LoopEvent>,
    initiator: Option<RollCallInitiator>,
}

pub struct Coordinator {
    state: LoopState,
    inbox: MailboxReceivers,
    events: mpsc::UnboundedReceiver<LoopEvent>,
    shutdown: watch::Receiver<bool>,
}

impl Coordinator {
    pub fn new(ctx: NodeContext, inbox: MailboxReceivers, shutdown: watch::Receiver<bool>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let initiator = ctx.config.is_head().then(|| RollCallInitiator {
            sessions: HashMap::new(),
            policy: ctx.policy.clone(),
            window: ctx.config.rollcall_window,
            min_responders: ctx.config.min_responders,
        });

        Self {
            state: LoopState {
                pool: WorkerPool::new(ctx.config.worker_count, ctx.config.pool_backlog),
                ctx,
                events: events_tx,
                initiator,
            },
            inbox,
            events: events_rx,
            shutdown,
        }
    }

    pub async fn run(self) {
        let Self {
            mut state,
            mut inbox,
            mut events,
            mut shutdown,
        } = self;

        tracing::info!(
            "Coordination loop started (role={}, peer={})",
            state.ctx.config.role,
            state.ctx.transport.local_peer()
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(request) = inbox.install.recv() => state.on_install(request),
                Some(inbound) = inbox.roll_call.recv() => state.on_roll_call(inbound).await,
                Some(inbound) = inbox.roll_call_response.recv() => {
                    state.on_roll_call_response(inbound).await
                }
                Some(request) = inbox.execute.recv() => state.on_execute(request).await,
                Some(inbound) = inbox.execute_response.recv() => state.on_execute_response(inbound),
                Some(inbound) = inbox.health.recv() => state.on_health_ping(inbound),
                Some(event) = events.recv() => state.on_event(event).await,
                else => break,
            }
        }

        tracing::info!("Coordination loop stopped");
    }
}

impl LoopState {
    // --- Handlers ---

    fn on_install(&mut self, request: InstallRequest) {
        tracing::info!(
            "Install requested for {} ({:?})",
            request.manifest_url,
            request.origin
        );

        let installer = self.ctx.installer.clone();
        let events = self.events.clone();
        let manifest_url = request.manifest_url.clone();

        let admitted = self.pool.try_spawn(async move {
            let outcome = installer
                .install(request.manifest_url.clone())
                .await
                .map_err(|e| e.to_string());

            let _ = events.send(LoopEvent::InstallFinished {
                origin: request.origin,
                manifest_url: request.manifest_url,
                outcome,
            });
        });

        if let Err(e) = admitted {
            tracing::warn!("Rejected install of {}: {}", manifest_url, e);
        }
    }

    async fn on_roll_call(&mut self, inbound: Inbound<RollCall>) {
        let Inbound { from, message } = inbound;

        if self.ctx.config.role != Role::Worker {
            tracing::trace!("Ignoring roll call from {} (not a worker)", from);
            return;
        }

        if !message.function_id.is_empty() && !self.ctx.dispatcher.can_run(&message.function_id) {
            tracing::debug!(
                "Cannot serve roll call from {} for function {}",
                from,
                message.function_id
            );
            return;
        }

        tracing::debug!("Answering roll call from {} ({:?})", from, message.request_id);

        self.publish(Envelope::RollCallResponse(RollCallResponse {
            code: codes::OK,
            role: self.ctx.config.role,
            request_id: message.request_id,
            function_id: message.function_id,
        }))
        .await;
    }

    async fn on_roll_call_response(&mut self, inbound: Inbound<RollCallResponse>) {
        let Inbound { from, message } = inbound;

        let Some(initiator) = self.initiator.as_mut() else {
            tracing::trace!("Ignoring roll call response from {} (not a head)", from);
            return;
        };

        let Some(request_id) = message.request_id.clone() else {
            tracing::debug!("Roll call response from {} carries no request id", from);
            return;
        };

        let Some(session) = initiator.sessions.get_mut(&request_id) else {
            tracing::debug!("No open roll call {} for response from {}", request_id, from);
            return;
        };

        if session.record(from, &message) && session.quorum_reached() {
            self.close_session(&request_id).await;
        }
    }

    async fn on_execute(&mut self, request: ExecuteRequest) {
        if request.origin == Origin::Local && self.initiator.is_some() {
            self.start_roll_call(request).await;
        } else {
            self.run_locally(request).await;
        }
    }

    fn on_execute_response(&mut self, inbound: Inbound<ExecuteResponse>) {
        let Inbound { from, message } = inbound;
        let request_id = message.request_id.clone();

        let completed = self.ctx.correlation.complete(
            &request_id,
            Completion::Response(ExecutionResult {
                request_id: message.request_id,
                code: message.code,
                result: message.result,
                peer: Some(from.clone()),
            }),
        );

        if completed {
            tracing::debug!("Request {} answered by {}", request_id, from);
        } else {
            tracing::debug!("Dropped response for request {} from {}", request_id, from);
        }
    }

    fn on_health_ping(&mut self, inbound: Inbound<HealthPing>) {
        tracing::trace!(
            "Health ping from {} (code {})",
            inbound.from,
            inbound.message.code
        );
    }

    async fn on_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::WindowClosed(request_id) => self.close_session(&request_id).await,
            LoopEvent::ExecutionFinished { origin, response } => {
                self.finish_execution(origin, response).await
            }
            LoopEvent::InstallFinished {
                origin,
                manifest_url,
                outcome,
            } => match outcome {
                Ok(manifest) => tracing::info!(
                    "Installed {} from {} ({:?})",
                    manifest.function_id,
                    manifest_url,
                    origin
                ),
                Err(e) => tracing::error!("Install from {} failed: {}", manifest_url, e),
            },
        }
    }

    // --- Roll call (head) ---

    async fn start_roll_call(&mut self, request: ExecuteRequest) {
        let Some(initiator) = self.initiator.as_mut() else {
            return;
        };

        let request_id = match request.request_id {
            Some(id) => id,
            None => {
                let id = RequestId::new();
                if let Err(e) = self.ctx.correlation.open(id.clone()) {
                    tracing::error!("Cannot track execution: {}", e);
                    return;
                }
                id
            }
        };

        if initiator.sessions.contains_key(&request_id) {
            tracing::warn!("Roll call {} already in progress", request_id);
            return;
        }

        let window = initiator.window;
        initiator.sessions.insert(
            request_id.clone(),
            RollCallSession::open(
                request_id.clone(),
                request.function_id.clone(),
                request.method,
                window,
                initiator.min_responders,
            ),
        );

        tracing::info!(
            "Roll call {} for function {} (window {:?})",
            request_id,
            request.function_id,
            window
        );

        self.publish(Envelope::RollCall(RollCall {
            request_id: Some(request_id.clone()),
            function_id: request.function_id,
        }))
        .await;

        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = events.send(LoopEvent::WindowClosed(request_id));
        });
    }

    async fn close_session(&mut self, request_id: &RequestId) {
        let Some(initiator) = self.initiator.as_mut() else {
            return;
        };

        // A session closed early by quorum is already gone when its timer fires.
        let Some(mut session) = initiator.sessions.remove(request_id) else {
            return;
        };

        match session.close(initiator.policy.as_ref()) {
            SessionOutcome::Selected(peer) => {
                // The caller may have given up while the window was still open.
                if self.ctx.correlation.state(request_id) != Some(RecordState::Open) {
                    tracing::debug!(
                        "Request {} no longer awaited, not dispatching to {}",
                        request_id,
                        peer
                    );
                    return;
                }

                tracing::info!("Dispatching request {} to {}", request_id, peer);

                let envelope = Envelope::Execute(Execute {
                    function_id: session.function_id.clone(),
                    method: session.method.clone(),
                    request_id: Some(request_id.clone()),
                });

                if let Err(e) = self.send_to(&peer, envelope).await {
                    tracing::error!("Failed to dispatch request {} to {}: {}", request_id, peer, e);
                    self.ctx.correlation.complete(
                        request_id,
                        Completion::Response(ExecutionResult {
                            request_id: request_id.clone(),
                            code: codes::NOT_CAPABLE,
                            result: format!("dispatch to {} failed: {}", peer, e),
                            peer: Some(peer),
                        }),
                    );
                }
            }
            SessionOutcome::TimedOut => {
                tracing::warn!(
                    "Roll call {} found no capable peer for {}",
                    request_id,
                    session.function_id
                );
                self.ctx.correlation.complete(
                    request_id,
                    Completion::NoCapablePeer {
                        function_id: session.function_id.clone(),
                    },
                );
            }
        }
    }

    // --- Local execution ---

    async fn run_locally(&mut self, request: ExecuteRequest) {
        let request_id = request.request_id.clone().unwrap_or_default();
        let origin = request.origin.clone();
        let dispatcher = self.ctx.dispatcher.clone();
        let events = self.events.clone();
        let job_id = request_id.clone();

        let admitted = self.pool.try_spawn(async move {
            let response = dispatcher
                .execute(Some(job_id), &request.function_id, &request.method)
                .await;

            let _ = events.send(LoopEvent::ExecutionFinished {
                origin: request.origin,
                response,
            });
        });

        // A saturated pool still answers, so the requester's record completes.
        if let Err(e) = admitted {
            tracing::warn!("Rejected request {}: {}", request_id, e);
            let response = ExecuteResponse {
                request_id,
                code: codes::NOT_CAPABLE,
                result: e.to_string(),
            };
            self.finish_execution(origin, response).await;
        }
    }

    async fn finish_execution(&mut self, origin: Origin, response: ExecuteResponse) {
        match origin {
            Origin::Peer(peer) => {
                let request_id = response.request_id.clone();
                if let Err(e) = self
                    .send_to(&peer, Envelope::ExecuteResponse(response))
                    .await
                {
                    tracing::warn!("Failed to reply to {} for request {}: {}", peer, request_id, e);
                }
            }
            Origin::Local => {
                let request_id = response.request_id.clone();
                self.ctx.correlation.complete(
                    &request_id,
                    Completion::Response(ExecutionResult {
                        request_id: response.request_id,
                        code: response.code,
                        result: response.result,
                        peer: None,
                    }),
                );
            }
        }
    }

    // --- Outbound ---

    /// Broadcasts on the node topic. Best effort: failures are logged only.
    async fn publish(&self, envelope: Envelope) {
        let kind = envelope.kind();
        let payload = match encode(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode {}: {}", kind, e);
                return;
            }
        };

        if let Err(e) = self
            .ctx
            .transport
            .publish(&self.ctx.config.topic, payload)
            .await
        {
            tracing::warn!("Failed to publish {}: {}", kind, e);
        }
    }

    async fn send_to(&self, peer: &PeerId, envelope: Envelope) -> Result<()> {
        let payload = encode(&envelope)?;
        self.ctx.transport.send_to(peer, payload).await
    }
}
