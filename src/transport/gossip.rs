//! UDP gossip transport.
//!
//! Membership follows a SWIM-like model: each node periodically pings a random alive
//! member, acks carry the full member list, and silence moves a member through
//! Alive -> Suspect -> Dead. Application payloads ride on the same socket as
//! `Publish` (fanned out to every alive member) and `Direct` frames.

use super::types::{GossipMessage, Member, MemberState, PeerId};
use super::{BoxFuture, InboundFrame, Transport};

use anyhow::Result;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{RwLock, mpsc};
use tracing::info;

const GOSSIP_INTERVAL: Duration = Duration::from_millis(500);
const FAILURE_DETECTION_INTERVAL: Duration = Duration::from_secs(2);
const SUSPECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEAD_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a dead member is kept so late gossip about it is not taken as news.
const DEAD_RETENTION: Duration = Duration::from_secs(30);

pub struct GossipTransport {
    pub local_member: Member,
    pub members: Arc<DashMap<PeerId, Member>>,
    socket: Arc<UdpSocket>,
    incarnation: Arc<RwLock<u64>>,
    subscriptions: DashMap<String, Vec<mpsc::UnboundedSender<InboundFrame>>>,
    discovery: DashMap<String, Vec<mpsc::UnboundedSender<PeerId>>>,
}

impl GossipTransport {
    /// Binds the UDP socket and sends a join request to every seed.
    ///
    /// Background loops are not running until `start` is called.
    pub async fn bind(bind_addr: SocketAddr, seed_nodes: Vec<SocketAddr>) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let incarnation_counter = Arc::new(RwLock::new(1));
        let current_inc = *incarnation_counter.read().await;
        let local_member = Member {
            id: PeerId::new(),
            addr: local_addr,
            state: MemberState::Alive,
            incarnation: current_inc,
            last_seen: Some(Instant::now()),
        };
        let members = Arc::new(DashMap::new());
        members.insert(local_member.id.clone(), local_member.clone());

        if !seed_nodes.is_empty() {
            info!("Joining overlay via {} seed node(s)", seed_nodes.len());

            let msg = GossipMessage::Join {
                member: local_member.clone(),
            };
            let encoded = bincode::serialize(&msg)?;

            for seed_node in seed_nodes.iter() {
                socket.send_to(&encoded, seed_node).await?;
                info!("Sent join request to {}", seed_node);
            }
        }

        Ok(Arc::new(Self {
            local_member,
            members,
            socket: Arc::new(socket),
            incarnation: incarnation_counter,
            subscriptions: DashMap::new(),
            discovery: DashMap::new(),
        }))
    }

    pub async fn start(self: Arc<Self>) {
        tracing::info!("Starting gossip transport on {}", self.local_member.addr);

        {
            let transport = self.clone();
            tokio::spawn(async move {
                transport.gossip_loop().await;
            });
        }

        {
            let transport = self.clone();
            tokio::spawn(async move {
                transport.receive_loop().await;
            });
        }

        {
            let transport = self.clone();
            tokio::spawn(async move {
                transport.failure_detection_loop().await;
            });
        }

        tracing::info!("All gossip background tasks started");
    }

    pub fn alive_members(&self) -> Vec<Member> {
        self.members
            .iter()
            .filter(|entry| entry.value().state == MemberState::Alive)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_member(&self, id: &PeerId) -> Option<Member> {
        self.members.get(id).map(|entry| entry.value().clone())
    }

    fn alive_remote_addrs(&self) -> Vec<(PeerId, SocketAddr)> {
        self.members
            .iter()
            .filter(|entry| {
                entry.value().id != self.local_member.id
                    && entry.value().state == MemberState::Alive
            })
            .map(|entry| (entry.value().id.clone(), entry.value().addr))
            .collect()
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(GOSSIP_INTERVAL);

        loop {
            interval.tick().await;

            let targets = self.alive_remote_addrs();
            if targets.is_empty() {
                continue;
            }

            use rand::Rng;
            let idx = rand::thread_rng().gen_range(0..targets.len());
            let (target_id, target_addr) = &targets[idx];

            let incarnation = *self.incarnation.read().await;
            let msg = GossipMessage::Ping {
                from: self.local_member.id.clone(),
                incarnation,
            };

            match bincode::serialize(&msg) {
                Ok(encoded) => {
                    if let Err(e) = self.socket.send_to(&encoded, target_addr).await {
                        tracing::warn!("Failed to send ping to {}: {}", target_id, e);
                    } else {
                        tracing::trace!("Sent ping to {}", target_id);
                    }
                }
                Err(e) => tracing::error!("Failed to serialize ping: {}", e),
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<GossipMessage>(&buf[..len]) {
                    Ok(msg) => {
                        if let Err(e) = self.handle_message(msg, src).await {
                            tracing::error!("Error handling gossip frame from {}: {}", src, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize gossip frame from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_message(&self, msg: GossipMessage, src: SocketAddr) -> Result<()> {
        match msg {
            GossipMessage::Join { member } => self.handle_join(member, src).await?,
            GossipMessage::Ping { from, incarnation } => {
                self.handle_ping(from, incarnation, src).await?
            }
            GossipMessage::Ack {
                from,
                incarnation,
                members,
            } => self.handle_ack(from, incarnation, members),
            GossipMessage::Suspect { peer, incarnation } => {
                self.handle_suspect(peer, incarnation).await
            }
            GossipMessage::Alive { peer, incarnation } => self.handle_alive(peer, incarnation),
            GossipMessage::Publish {
                from,
                topic,
                payload,
            } => self.deliver(Some(topic.as_str()), InboundFrame { from, payload }),
            GossipMessage::Direct { from, payload } => {
                self.deliver(None, InboundFrame { from, payload })
            }
        }

        Ok(())
    }

    async fn handle_join(&self, mut member: Member, src: SocketAddr) -> Result<()> {
        tracing::info!("Peer {} joining overlay at {}", member.id, member.addr);

        member.addr = src;
        member.state = MemberState::Alive;
        self.insert_new(member);

        tracing::info!("Overlay size now: {}", self.members.len());

        self.send_ack(src).await
    }

    async fn handle_ping(&self, from: PeerId, from_incarnation: u64, src: SocketAddr) -> Result<()> {
        tracing::trace!("Received ping from {}", from);

        if !self.heard_from(&from, from_incarnation) {
            tracing::info!("Discovered new peer via ping: {} at {}", from, src);
            self.insert_new(Member {
                id: from,
                addr: src,
                state: MemberState::Alive,
                incarnation: from_incarnation,
                last_seen: None,
            });
        }

        self.send_ack(src).await
    }

    async fn send_ack(&self, to: SocketAddr) -> Result<()> {
        let all_members: Vec<Member> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let reply = GossipMessage::Ack {
            from: self.local_member.id.clone(),
            incarnation: *self.incarnation.read().await,
            members: all_members,
        };

        let encoded = bincode::serialize(&reply)?;
        self.socket.send_to(&encoded, to).await?;

        Ok(())
    }

    /// Records direct contact from `peer`. A peer that talks to us is alive
    /// whatever the overlay last claimed. Returns false for unknown peers.
    fn heard_from(&self, peer: &PeerId, incarnation: u64) -> bool {
        let Some(mut member) = self.members.get_mut(peer) else {
            return false;
        };

        member.last_seen = Some(Instant::now());
        member.incarnation = member.incarnation.max(incarnation);
        if member.state != MemberState::Alive {
            tracing::info!("Peer {} is back in contact", peer);
            member.state = MemberState::Alive;
        }
        true
    }

    fn insert_new(&self, mut member: Member) {
        member.last_seen = Some(Instant::now());
        let id = member.id.clone();
        if self.members.insert(id.clone(), member).is_none() {
            self.announce(&id);
        }
    }

    fn handle_ack(&self, from: PeerId, from_incarnation: u64, members: Vec<Member>) {
        tracing::trace!("Ack from {} carries {} members", from, members.len());

        self.heard_from(&from, from_incarnation);
        for member in members {
            self.merge_member(member);
        }
    }

    /// Folds one entry of a peer's member list into ours.
    fn merge_member(&self, claim: Member) {
        if claim.id == self.local_member.id {
            return;
        }

        let changed = match self.members.get_mut(&claim.id) {
            Some(mut existing) => existing.observe(claim.state, claim.incarnation, Instant::now()),
            None if claim.state == MemberState::Dead => return,
            None => {
                tracing::info!("Discovered new peer: {} at {}", claim.id, claim.addr);
                self.insert_new(claim);
                return;
            }
        };

        if changed {
            tracing::debug!("{} is now {:?} (inc={})", claim.id, claim.state, claim.incarnation);
        }
    }

    async fn handle_suspect(&self, peer: PeerId, incarnation: u64) {
        if peer == self.local_member.id {
            self.refute(incarnation).await;
            return;
        }

        let suspected = self
            .members
            .get_mut(&peer)
            .map(|mut member| member.observe(MemberState::Suspect, incarnation, Instant::now()));

        match suspected {
            Some(true) => tracing::info!("Peer {} suspected by the overlay", peer),
            Some(false) => {}
            None => tracing::debug!("Suspected peer {} doesn't exist", peer),
        }
    }

    /// Answers a suspicion about ourselves by outbidding its incarnation.
    async fn refute(&self, suspected_at: u64) {
        let incarnation = {
            let mut current = self.incarnation.write().await;
            if suspected_at < *current {
                return;
            }
            *current = suspected_at + 1;
            *current
        };

        if let Some(mut me) = self.members.get_mut(&self.local_member.id) {
            me.observe(MemberState::Alive, incarnation, Instant::now());
        }

        tracing::info!("Refuting suspicion about ourselves (inc={})", incarnation);
        self.broadcast_message(GossipMessage::Alive {
            peer: self.local_member.id.clone(),
            incarnation,
        })
        .await;
    }

    fn handle_alive(&self, peer: PeerId, incarnation: u64) {
        let revived = self
            .members
            .get_mut(&peer)
            .map(|mut member| member.observe(MemberState::Alive, incarnation, Instant::now()));

        match revived {
            Some(true) => tracing::info!("Peer {} is Alive (inc={})", peer, incarnation),
            Some(false) => {}
            None => tracing::debug!("Alive message for unknown peer {}", peer),
        }
    }

    async fn failure_detection_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(FAILURE_DETECTION_INTERVAL);

        loop {
            interval.tick().await;
            let now = Instant::now();

            for msg in self.detect_failures(now) {
                self.broadcast_message(msg).await;
            }

            let pruned = self.prune_dead(now);
            if pruned > 0 {
                tracing::info!("Forgot {} dead peer(s), {} remain", pruned, self.members.len());
            }
        }
    }

    /// Moves silent members down the Alive -> Suspect -> Dead ladder and returns
    /// the suspicions to spread.
    pub fn detect_failures(&self, now: Instant) -> Vec<GossipMessage> {
        let mut suspicions = Vec::new();

        for mut entry in self.members.iter_mut() {
            if *entry.key() == self.local_member.id {
                continue;
            }
            let member = entry.value_mut();
            let silence = member.silence(now);

            match member.state {
                MemberState::Alive if silence > SUSPECT_TIMEOUT => {
                    tracing::warn!("Peer {} suspected (silent for {:?})", member.id, silence);
                    member.state = MemberState::Suspect;
                    suspicions.push(GossipMessage::Suspect {
                        peer: member.id.clone(),
                        incarnation: member.incarnation,
                    });
                }
                MemberState::Suspect if silence > DEAD_TIMEOUT => {
                    tracing::warn!("Peer {} declared DEAD (silent for {:?})", member.id, silence);
                    member.state = MemberState::Dead;
                }
                _ => {}
            }
        }

        suspicions
    }

    /// Drops members that have stayed dead past the retention period.
    pub fn prune_dead(&self, now: Instant) -> usize {
        let mut pruned = 0;
        self.members.retain(|_, member| {
            let expired = member.state == MemberState::Dead
                && member.silence(now) > DEAD_TIMEOUT + DEAD_RETENTION;
            if expired {
                pruned += 1;
            }
            !expired
        });
        pruned
    }

    async fn broadcast_message(&self, msg: GossipMessage) {
        match bincode::serialize(&msg) {
            Ok(encoded) => self.fan_out(&encoded).await,
            Err(e) => tracing::error!("Failed to serialize gossip frame: {}", e),
        }
    }

    async fn fan_out(&self, encoded: &[u8]) {
        for (peer, addr) in self.alive_remote_addrs() {
            if let Err(e) = self.socket.send_to(encoded, addr).await {
                tracing::warn!("Failed to send to {}: {}", peer, e);
            }
        }
    }

    fn deliver(&self, topic: Option<&str>, frame: InboundFrame) {
        for mut entry in self.subscriptions.iter_mut() {
            if topic.is_some_and(|t| t != entry.key().as_str()) {
                continue;
            }
            entry
                .value_mut()
                .retain(|subscriber| subscriber.send(frame.clone()).is_ok());
        }
    }

    fn announce(&self, peer: &PeerId) {
        for mut entry in self.discovery.iter_mut() {
            entry
                .value_mut()
                .retain(|listener| listener.send(peer.clone()).is_ok());
        }
    }
}

impl Transport for GossipTransport {
    fn local_peer(&self) -> PeerId {
        self.local_member.id.clone()
    }

    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let encoded = bincode::serialize(&GossipMessage::Publish {
                from: self.local_member.id.clone(),
                topic: topic.to_string(),
                payload,
            })?;
            self.fan_out(&encoded).await;
            Ok(())
        })
    }

    fn send_to<'a>(&'a self, peer: &'a PeerId, payload: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let member = self
                .get_member(peer)
                .ok_or_else(|| anyhow::anyhow!("Unknown peer: {}", peer))?;

            let encoded = bincode::serialize(&GossipMessage::Direct {
                from: self.local_member.id.clone(),
                payload,
            })?;
            self.socket.send_to(&encoded, member.addr).await?;
            Ok(())
        })
    }

    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<InboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }

    fn discover_peers(&self, topic: &str) -> mpsc::UnboundedReceiver<PeerId> {
        let (tx, rx) = mpsc::unbounded_channel();
        for peer in self.known_peers() {
            let _ = tx.send(peer);
        }
        self.discovery.entry(topic.to_string()).or_default().push(tx);
        rx
    }

    fn known_peers(&self) -> Vec<PeerId> {
        self.alive_remote_addrs()
            .into_iter()
            .map(|(peer, _)| peer)
            .collect()
    }
}
