//! A transport partition that silently drops every packet between two
//! peers for a while must not leave them permanently diverged: once the
//! partition heals, shared state and topic reconverge on both sides and
//! their version vectors agree again (testable property 5, §4.7).

use std::time::Duration;

use talus_engine::EngineConfig;
use talus_integration_tests::{all_connected, pump, spawn_founder, spawn_joiner, Peer};
use talus_state::Privacy;
use talus_transport::LoopbackHub;
use talus_types::Role;

fn fast_sync_config() -> EngineConfig {
    EngineConfig { ping_interval: Duration::ZERO, ..EngineConfig::default() }
}

/// Like `iterate()` + drain, but the drained bytes are thrown away instead
/// of handed to the transport — a one-sided network partition rather than
/// a disconnect, since each engine still believes its peer link is alive.
fn partition_round(peers: &mut [Peer]) {
    for peer in peers.iter_mut() {
        peer.engine.iterate();
        let _ = peer.engine.pending_outbound();
    }
}

#[test]
fn test_peers_reconverge_after_a_silent_partition_heals() {
    let hub = LoopbackHub::new();

    let mut founder = spawn_founder(&hub, fast_sync_config(), Privacy::Public, b"outpost", b"founder");
    let mut member = spawn_joiner(
        &hub,
        fast_sync_config(),
        founder.address.clone(),
        founder.engine.own_enc_pk(),
        founder.engine.chat_id(),
        Vec::new(),
        b"member",
    );
    let mut peers = vec![founder, member];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    founder = peers.remove(0);
    member = peers.remove(0);

    let member_target = founder.engine.peer_ids()[0];
    founder.engine.set_topic(b"before the split".to_vec()).expect("set topic ok");
    founder.engine.set_role(member_target, Role::Moderator).expect("promote");

    // The partition: founder's broadcasts and pings are generated and then
    // thrown away, exactly as if every packet to `member` were lost in
    // flight. Neither engine is told the link is down.
    let mut partitioned = vec![founder, member];
    for _ in 0..16 {
        partition_round(&mut partitioned);
    }
    founder = partitioned.remove(0);
    member = partitioned.remove(0);
    assert_ne!(member.engine.own_role(), Role::Moderator, "update must not have crossed the partition");
    assert_ne!(member.engine.topic(), Some(b"before the split".as_slice()));

    // founder changes the topic again while still partitioned, so the
    // eventual catch-up has to land on the *later* of two writes, not
    // just the first one queued.
    founder.engine.set_topic(b"after the split".to_vec()).expect("set topic ok");

    // The dropped broadcasts only become due for retransmission once the
    // lossless channel's initial backoff elapses; let real time pass
    // before pumping again instead of spinning through rounds that the
    // retry timer will just skip.
    std::thread::sleep(Duration::from_millis(250));

    let mut peers = vec![founder, member];
    pump(&mut peers, 64, |p| {
        p[1].engine.own_role() == Role::Moderator && p[1].engine.topic() == Some(b"after the split".as_slice())
    });

    assert_eq!(peers[0].engine.topic(), peers[1].engine.topic());
    assert!(peers[1].engine.is_moderator(peers[1].engine.own_sig_pk()));
    let vectors: Vec<_> = peers.iter().map(|peer| peer.engine.version_vector()).collect();
    assert_eq!(vectors[0].topic_version, vectors[1].topic_version);
}
