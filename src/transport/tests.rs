//! Transport Module Tests
//!
//! ## Test Scopes
//! - **Memory transport**: Topic publish, direct send, discovery replay and self-exclusion.
//! - **Gossip wire protocol**: Frames survive bincode serialization.
//! - **Gossip membership**: Incarnation precedence, the failure ladder and dead-member pruning.
//! - **Gossip transport**: Two nodes on loopback join, discover and exchange payloads.

#[cfg(test)]
mod tests {
    use crate::transport::gossip::GossipTransport;
    use crate::transport::memory::MemoryNetwork;
    use crate::transport::types::{GossipMessage, Member, MemberState};
    use crate::transport::{PeerId, Transport};
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    const TOPIC: &str = "compute/mesh/test";

    // ============================================================
    // MEMORY TRANSPORT
    // ============================================================

    #[tokio::test]
    async fn test_memory_publish_reaches_other_subscribers_only() {
        // ARRANGE
        let network = MemoryNetwork::new();
        let a = network.join();
        let b = network.join();
        let mut a_frames = a.subscribe(TOPIC);
        let mut b_frames = b.subscribe(TOPIC);
        let mut b_other = b.subscribe("other/topic");

        // ACT
        a.publish(TOPIC, b"hello".to_vec()).await.unwrap();

        // ASSERT
        let frame = b_frames.recv().await.unwrap();
        assert_eq!(frame.from, a.local_peer());
        assert_eq!(frame.payload, b"hello");
        assert!(a_frames.try_recv().is_err(), "Publisher must not hear itself");
        assert!(b_other.try_recv().is_err(), "Other topics stay quiet");
    }

    #[tokio::test]
    async fn test_memory_send_to_targets_one_peer() {
        let network = MemoryNetwork::new();
        let a = network.join();
        let b = network.join();
        let c = network.join();
        let mut b_frames = b.subscribe(TOPIC);
        let mut c_frames = c.subscribe(TOPIC);

        a.send_to(&b.local_peer(), b"direct".to_vec()).await.unwrap();

        assert_eq!(b_frames.recv().await.unwrap().payload, b"direct");
        assert!(c_frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_memory_send_to_unknown_peer_fails() {
        let network = MemoryNetwork::new();
        let a = network.join();
        let b = network.join();
        let gone = b.local_peer();
        network.leave(&gone);

        let result = a.send_to(&gone, b"lost".to_vec()).await;

        assert!(result.is_err());
        assert_eq!(network.peer_count(), 1);
        assert!(a.known_peers().is_empty());
    }

    #[tokio::test]
    async fn test_memory_discovery_replays_and_follows() {
        let network = MemoryNetwork::new();
        let a = network.join();
        let b = network.join();

        let mut discovered = a.discover_peers(TOPIC);
        assert_eq!(discovered.recv().await.unwrap(), b.local_peer());

        let c = network.join();
        assert_eq!(discovered.recv().await.unwrap(), c.local_peer());

        let mut known = a.known_peers();
        known.sort();
        let mut expected = vec![b.local_peer(), c.local_peer()];
        expected.sort();
        assert_eq!(known, expected);
    }

    // ============================================================
    // GOSSIP WIRE PROTOCOL
    // ============================================================

    #[test]
    fn test_gossip_publish_frame_serialization() {
        let msg = GossipMessage::Publish {
            from: PeerId::from("node-1"),
            topic: TOPIC.to_string(),
            payload: vec![1, 2, 3],
        };

        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: GossipMessage = bincode::deserialize(&encoded).unwrap();

        match decoded {
            GossipMessage::Publish {
                from,
                topic,
                payload,
            } => {
                assert_eq!(from, PeerId::from("node-1"));
                assert_eq!(topic, TOPIC);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("Expected Publish, got {:?}", other),
        }
    }

    #[test]
    fn test_gossip_member_skips_last_seen() {
        let member = Member {
            id: PeerId::from("node-1"),
            addr: "127.0.0.1:5000".parse().unwrap(),
            state: MemberState::Suspect,
            incarnation: 7,
            last_seen: Some(Instant::now()),
        };

        let encoded = bincode::serialize(&GossipMessage::Join { member }).unwrap();
        let decoded: GossipMessage = bincode::deserialize(&encoded).unwrap();

        match decoded {
            GossipMessage::Join { member } => {
                assert_eq!(member.state, MemberState::Suspect);
                assert_eq!(member.incarnation, 7);
                assert!(member.last_seen.is_none());
            }
            other => panic!("Expected Join, got {:?}", other),
        }
    }

    // ============================================================
    // GOSSIP MEMBERSHIP
    // ============================================================

    fn member(name: &str, state: MemberState, incarnation: u64, last_seen: Instant) -> Member {
        Member {
            id: PeerId::from(name),
            addr: "127.0.0.1:5000".parse().unwrap(),
            state,
            incarnation,
            last_seen: Some(last_seen),
        }
    }

    #[test]
    fn test_member_observe_precedence() {
        let now = Instant::now();
        let mut peer = member("node-1", MemberState::Alive, 3, now);

        // Stale claims are ignored
        assert!(!peer.observe(MemberState::Dead, 2, now));
        // Same incarnation: suspicion beats alive, alive refutes suspicion
        assert!(peer.observe(MemberState::Suspect, 3, now));
        assert_eq!(peer.state, MemberState::Suspect);
        assert!(peer.observe(MemberState::Alive, 3, now));
        assert_eq!(peer.state, MemberState::Alive);
        // Same incarnation cannot declare death
        assert!(!peer.observe(MemberState::Dead, 3, now));
        // A newer incarnation always wins
        assert!(peer.observe(MemberState::Dead, 4, now));
        assert_eq!((peer.state, peer.incarnation), (MemberState::Dead, 4));
    }

    #[tokio::test]
    async fn test_gossip_silent_peer_walks_failure_ladder() {
        // ARRANGE
        let transport = GossipTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();
        let start = Instant::now();
        let peer = PeerId::from("quiet");
        transport
            .members
            .insert(peer.clone(), member("quiet", MemberState::Alive, 1, start));

        // ACT + ASSERT: Suspected and announced after a few silent seconds
        let suspicions = transport.detect_failures(start + Duration::from_secs(6));
        assert_eq!(suspicions.len(), 1);
        assert!(matches!(&suspicions[0], GossipMessage::Suspect { peer: p, incarnation: 1 } if *p == peer));
        assert!(!transport.known_peers().contains(&peer));

        // Dead once the silence outlasts the dead timeout
        let suspicions = transport.detect_failures(start + Duration::from_secs(11));
        assert!(suspicions.is_empty());
        assert_eq!(transport.get_member(&peer).unwrap().state, MemberState::Dead);

        // The local member is never judged
        let local = transport.get_member(&transport.local_peer()).unwrap();
        assert_eq!(local.state, MemberState::Alive);
    }

    #[tokio::test]
    async fn test_gossip_prunes_dead_members_after_retention() {
        // ARRANGE: One long-dead, one freshly dead and one silent-but-alive member
        let transport = GossipTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();
        let now = Instant::now();
        for m in [
            member("gone", MemberState::Dead, 1, now),
            member("recent", MemberState::Dead, 1, now + Duration::from_secs(100)),
            member("quiet", MemberState::Alive, 1, now),
        ] {
            transport.members.insert(m.id.clone(), m);
        }

        // ACT
        let pruned = transport.prune_dead(now + Duration::from_secs(120));

        // ASSERT
        assert_eq!(pruned, 1);
        assert!(transport.get_member(&PeerId::from("gone")).is_none());
        assert!(transport.get_member(&PeerId::from("recent")).is_some());
        assert!(transport.get_member(&PeerId::from("quiet")).is_some());
        assert!(transport.get_member(&transport.local_peer()).is_some());
    }

    // ============================================================
    // GOSSIP TRANSPORT
    // ============================================================

    async fn wait_for_peer(transport: &GossipTransport, peer: &PeerId) {
        timeout(Duration::from_secs(5), async {
            while !transport.known_peers().contains(peer) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("Peers should discover each other");
    }

    #[tokio::test]
    async fn test_gossip_nodes_join_and_exchange_payloads() {
        // ARRANGE: A founder and a node joining through it
        let founder = GossipTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();
        let joiner = GossipTransport::bind("127.0.0.1:0".parse().unwrap(), vec![
            founder.local_member.addr,
        ])
        .await
        .unwrap();

        let mut founder_frames = founder.subscribe(TOPIC);
        let mut joiner_frames = joiner.subscribe(TOPIC);

        founder.clone().start().await;
        joiner.clone().start().await;

        wait_for_peer(&founder, &joiner.local_peer()).await;
        wait_for_peer(&joiner, &founder.local_peer()).await;

        // ACT: Topic publish one way, direct send the other
        joiner.publish(TOPIC, b"broadcast".to_vec()).await.unwrap();
        founder
            .send_to(&joiner.local_peer(), b"direct".to_vec())
            .await
            .unwrap();

        // ASSERT
        let published = timeout(Duration::from_secs(2), founder_frames.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(published.from, joiner.local_peer());
        assert_eq!(published.payload, b"broadcast");

        let direct = timeout(Duration::from_secs(2), joiner_frames.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(direct.from, founder.local_peer());
        assert_eq!(direct.payload, b"direct");
    }
}
