use super::policy::SelectionPolicy;
use crate::messages::{RequestId, Role, RollCallResponse, codes};
use crate::transport::PeerId;

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Selected(PeerId),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Selected(PeerId),
    TimedOut,
}

/// A capable peer that answered the roll call.
#[derive(Debug, Clone)]
pub struct Responder {
    pub peer: PeerId,
    pub role: Role,
    /// Time between opening the session and the latest answer from this peer.
    pub latency: Duration,
}

/// One roll call, from broadcast to selection.
#[derive(Debug)]
pub struct RollCallSession {
    pub request_id: RequestId,
    pub function_id: String,
    pub method: String,
    opened_at: Instant,
    window: Duration,
    min_responders: Option<usize>,
    responders: Vec<Responder>,
    state: SessionState,
}

impl RollCallSession {
    pub fn open(
        request_id: RequestId,
        function_id: String,
        method: String,
        window: Duration,
        min_responders: Option<usize>,
    ) -> Self {
        Self {
            request_id,
            function_id,
            method,
            opened_at: Instant::now(),
            window,
            min_responders,
            responders: Vec::new(),
            state: SessionState::Collecting,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn responders(&self) -> &[Responder] {
        &self.responders
    }

    pub fn window_elapsed(&self) -> bool {
        self.opened_at.elapsed() >= self.window
    }

    /// Adds a response to the responder set.
    ///
    /// Only successful answers received while collecting and inside the window count.
    /// A repeated answer from the same peer replaces its record but keeps its arrival
    /// position. Returns whether the response was accepted.
    pub fn record(&mut self, peer: PeerId, response: &RollCallResponse) -> bool {
        if self.state != SessionState::Collecting || self.window_elapsed() {
            tracing::debug!(
                "Roll call {} no longer collecting, ignoring {}",
                self.request_id,
                peer
            );
            return false;
        }

        if response.code != codes::OK {
            tracing::debug!(
                "Peer {} declined roll call {} (code {})",
                peer,
                self.request_id,
                response.code
            );
            return false;
        }

        let responder = Responder {
            peer,
            role: response.role,
            latency: self.opened_at.elapsed(),
        };

        match self
            .responders
            .iter_mut()
            .find(|existing| existing.peer == responder.peer)
        {
            Some(existing) => *existing = responder,
            None => self.responders.push(responder),
        }

        true
    }

    /// Whether the early-close threshold has been met.
    pub fn quorum_reached(&self) -> bool {
        self.min_responders
            .is_some_and(|min| min > 0 && self.responders.len() >= min)
    }

    /// Ends collection and applies the selection policy.
    ///
    /// Closing an already closed session returns its existing outcome.
    pub fn close(&mut self, policy: &dyn SelectionPolicy) -> SessionOutcome {
        match &self.state {
            SessionState::Selected(peer) => return SessionOutcome::Selected(peer.clone()),
            SessionState::TimedOut => return SessionOutcome::TimedOut,
            SessionState::Collecting => {}
        }

        match policy.select(&self.responders) {
            Some(chosen) => {
                let peer = chosen.peer.clone();
                tracing::debug!(
                    "Roll call {} selected {} out of {} responder(s) ({})",
                    self.request_id,
                    peer,
                    self.responders.len(),
                    policy.name()
                );
                self.state = SessionState::Selected(peer.clone());
                SessionOutcome::Selected(peer)
            }
            None => {
                tracing::debug!("Roll call {} closed with no responders", self.request_id);
                self.state = SessionState::TimedOut;
                SessionOutcome::TimedOut
            }
        }
    }
}
