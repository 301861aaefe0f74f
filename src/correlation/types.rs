use crate::error::CoordinationError;
use crate::messages::RequestId;
use crate::transport::PeerId;

use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Open,
    Completed,
    Expired,
}

/// The answer to an execution, as seen by the node that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub request_id: RequestId,
    pub code: i32,
    pub result: String,
    /// Peer that produced the result. `None` when it ran locally.
    pub peer: Option<PeerId>,
}

/// What a pending record is completed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Response(ExecutionResult),
    /// The roll-call window closed without a capable responder.
    NoCapablePeer { function_id: String },
}

impl Completion {
    pub fn into_result(self) -> Result<ExecutionResult, CoordinationError> {
        match self {
            Completion::Response(result) => Ok(result),
            Completion::NoCapablePeer { function_id } => {
                Err(CoordinationError::NoCapablePeer { function_id })
            }
        }
    }
}

pub(crate) struct PendingRecord {
    pub(crate) created_at: Instant,
    pub(crate) state: RecordState,
    /// Holds the completion once there is one; waiters subscribe to it.
    pub(crate) notifier: watch::Sender<Option<Completion>>,
}

impl PendingRecord {
    pub(crate) fn new() -> Self {
        let (notifier, _) = watch::channel(None);
        Self {
            created_at: Instant::now(),
            state: RecordState::Open,
            notifier,
        }
    }

    pub(crate) fn is_older_than(&self, ttl: std::time::Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}
