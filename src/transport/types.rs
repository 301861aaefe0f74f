use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Opaque identity of a node on the overlay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemberState {
    Alive,
    Suspect,
    Dead,
}

/// A peer known to the gossip transport.
///
/// The `incarnation` field is a logical clock used to order updates and resolve
/// conflicts (e.g., refuting a false "Suspect" claim).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: PeerId,
    pub addr: SocketAddr,
    pub state: MemberState,
    pub incarnation: u64,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl Member {
    /// Applies a claim that this member is in `state` at `incarnation`.
    ///
    /// A newer incarnation always wins. At the same incarnation only a flip
    /// between alive and suspect is taken. Returns whether the member changed.
    pub fn observe(&mut self, state: MemberState, incarnation: u64, now: Instant) -> bool {
        let applies = match incarnation.cmp(&self.incarnation) {
            Ordering::Greater => true,
            Ordering::Equal => matches!(
                (self.state, state),
                (MemberState::Alive, MemberState::Suspect) | (MemberState::Suspect, MemberState::Alive)
            ),
            Ordering::Less => false,
        };

        if applies {
            self.state = state;
            self.incarnation = incarnation;
            if state != MemberState::Dead {
                self.last_seen = Some(now);
            }
        }
        applies
    }

    /// Time since the member was last heard of, starting the clock if it never was.
    pub fn silence(&mut self, now: Instant) -> std::time::Duration {
        let last_seen = *self.last_seen.get_or_insert(now);
        now.saturating_duration_since(last_seen)
    }
}

/// The UDP wire protocol between gossip transports.
///
/// - `Join`: Sent by new nodes to seed nodes to enter the overlay.
/// - `Ping/Ack`: Liveness checks and member-list synchronization.
/// - `Suspect/Alive`: Disseminates changes in peer health.
/// - `Publish/Direct`: Application payloads, fanned out per topic or sent to one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipMessage {
    Join {
        member: Member,
    },

    Ping {
        from: PeerId,
        incarnation: u64,
    },

    Ack {
        from: PeerId,
        incarnation: u64,
        members: Vec<Member>,
    },

    Suspect {
        peer: PeerId,
        incarnation: u64,
    },

    Alive {
        peer: PeerId,
        incarnation: u64,
    },

    Publish {
        from: PeerId,
        topic: String,
        payload: Vec<u8>,
    },

    Direct {
        from: PeerId,
        payload: Vec<u8>,
    },
}
