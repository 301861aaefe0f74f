use super::session::Responder;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks the peer that will receive the execution once a session closes.
pub trait SelectionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `responders` is in arrival order. Returns `None` only when it is empty.
    fn select<'a>(&self, responders: &'a [Responder]) -> Option<&'a Responder>;
}

/// Earliest arrival wins. Deterministic for a given arrival order.
///
/// This is a placeholder policy: it favours the fastest-answering worker and carries
/// no notion of load.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstResponder;

impl SelectionPolicy for FirstResponder {
    fn name(&self) -> &'static str {
        "first_responder"
    }

    fn select<'a>(&self, responders: &'a [Responder]) -> Option<&'a Responder> {
        responders.first()
    }
}

/// Rotates through responders across successive sessions.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl SelectionPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn select<'a>(&self, responders: &'a [Responder]) -> Option<&'a Responder> {
        if responders.is_empty() {
            return None;
        }
        let turn = self.next.fetch_add(1, Ordering::Relaxed);
        responders.get(turn % responders.len())
    }
}
