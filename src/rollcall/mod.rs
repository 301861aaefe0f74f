//! Roll-Call Protocol Module
//!
//! Head-side capability discovery. Before dispatching an execution, a head broadcasts
//! a `roll_call` and collects `roll_call_response` frames for a bounded window:
//!
//! ```text
//! Idle -> Collecting -> Selected(peer) | TimedOut -> Idle
//! ```
//!
//! A session closes when its window elapses or, when configured, as soon as a minimum
//! number of capable responders has answered. The chosen peer then receives the
//! `execute` directly; the reply is matched by request id in the correlation store.
//!
//! Sessions are owned by the coordination loop and are never shared, so they carry
//! no synchronization of their own.

pub mod policy;
pub mod session;

pub use policy::{FirstResponder, RoundRobin, SelectionPolicy};
pub use session::{Responder, RollCallSession, SessionOutcome, SessionState};
