use super::types::{Completion, ExecutionResult, PendingRecord, RecordState};
use crate::error::{CoordinationError, Result};
use crate::messages::RequestId;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Concurrency-safe map from request id to its pending/completed state.
///
/// Written by the coordination loop (completions) and read by callers blocked in
/// `wait`. Every operation is O(1) under the shard lock of its key.
pub struct CorrelationStore {
    records: DashMap<RequestId, PendingRecord>,
    ttl: Duration,
}

impl CorrelationStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            records: DashMap::new(),
            ttl,
        })
    }

    /// Registers a new pending record.
    ///
    /// Fails with `DuplicateRequest` if a record with this id already exists.
    pub fn open(&self, request_id: RequestId) -> Result<()> {
        match self.records.entry(request_id) {
            Entry::Occupied(entry) => {
                tracing::error!("Request id collision: {}", entry.key());
                Err(CoordinationError::DuplicateRequest(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                tracing::trace!("Opened correlation record {}", entry.key());
                entry.insert(PendingRecord::new());
                Ok(())
            }
        }
    }

    /// Stores the completion of an open record and wakes its waiter.
    ///
    /// Returns `false` without side effects when the id is unknown, already
    /// completed (first completion wins) or past its TTL (the record is evicted).
    pub fn complete(&self, request_id: &RequestId, completion: Completion) -> bool {
        let expired = match self.records.get_mut(request_id) {
            None => {
                tracing::debug!("Dropping completion for unknown request {}", request_id);
                return false;
            }
            Some(mut record) => {
                if record.state != RecordState::Open {
                    tracing::debug!(
                        "Ignoring duplicate completion for request {} ({:?})",
                        request_id,
                        record.state
                    );
                    return false;
                }

                if record.is_older_than(self.ttl) {
                    record.state = RecordState::Expired;
                    true
                } else {
                    record.state = RecordState::Completed;
                    record.notifier.send_replace(Some(completion));
                    false
                }
            }
        };

        if expired {
            tracing::debug!("Dropping late completion for expired request {}", request_id);
            self.records.remove(request_id);
            return false;
        }

        true
    }

    /// Waits until the record is completed or `timeout` elapses.
    ///
    /// The record is removed either way. A roll call that found nobody surfaces as
    /// `NoCapablePeer`; an elapsed deadline (or eviction underneath us) as `Timeout`.
    pub async fn wait(&self, request_id: &RequestId, timeout: Duration) -> Result<ExecutionResult> {
        let mut receiver = match self.records.get(request_id) {
            Some(record) => record.notifier.subscribe(),
            None => return Err(CoordinationError::UnknownRequest(request_id.clone())),
        };

        let outcome = tokio::time::timeout(timeout, async {
            receiver
                .wait_for(|completion| completion.is_some())
                .await
                .map(|completion| completion.clone())
        })
        .await;

        self.records.remove(request_id);

        match outcome {
            Ok(Ok(Some(completion))) => completion.into_result(),
            Ok(Ok(None)) | Ok(Err(_)) => {
                tracing::debug!("Request {} was evicted while awaited", request_id);
                Err(CoordinationError::Timeout(request_id.clone()))
            }
            Err(_) => {
                tracing::warn!("Request {} timed out after {:?}", request_id, timeout);
                Err(CoordinationError::Timeout(request_id.clone()))
            }
        }
    }

    pub fn state(&self, request_id: &RequestId) -> Option<RecordState> {
        self.records.get(request_id).map(|record| record.state)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes every record older than the TTL. Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut evicted = 0;

        self.records.retain(|request_id, record| {
            if !record.is_older_than(ttl) {
                return true;
            }
            if record.state == RecordState::Open {
                tracing::warn!("Request {} expired without a response", request_id);
            }
            record.state = RecordState::Expired;
            evicted += 1;
            false
        });

        if evicted > 0 {
            tracing::debug!("Evicted {} expired correlation records", evicted);
        }

        evicted
    }

    /// Drops a record nobody will wait on, e.g. after its request never reached
    /// the coordination loop.
    pub fn discard(&self, request_id: &RequestId) -> bool {
        self.records.remove(request_id).is_some()
    }

    /// Periodic eviction sweep. Runs until the surrounding task is dropped.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.evict_expired();
        }
    }
}
