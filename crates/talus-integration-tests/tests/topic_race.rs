//! Two directly-connected peers racing to set the topic from the same
//! base version must converge on a single winner on both sides, using
//! the deterministic tie-break when both land on the same version
//! (testable property 6, §4.6).

use std::time::Duration;

use talus_engine::EngineConfig;
use talus_integration_tests::{all_connected, pump, spawn_founder, spawn_joiner};
use talus_state::Privacy;
use talus_transport::LoopbackHub;

fn fast_sync_config() -> EngineConfig {
    EngineConfig { ping_interval: Duration::ZERO, ..EngineConfig::default() }
}

#[test]
fn test_concurrent_topic_race_converges_to_one_winner_everywhere() {
    let hub = LoopbackHub::new();

    let founder = spawn_founder(&hub, fast_sync_config(), Privacy::Public, b"senate", b"founder");
    let racer = spawn_joiner(
        &hub,
        fast_sync_config(),
        founder.address.clone(),
        founder.engine.own_enc_pk(),
        founder.engine.chat_id(),
        Vec::new(),
        b"racer",
    );

    let mut peers = vec![founder, racer];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));

    // Both sides set the topic before either has seen the other's write,
    // so each computes the same base version — a genuine race, resolved
    // only once the two updates cross and each side applies the other's.
    peers[0].engine.set_topic(b"founder's topic".to_vec()).expect("set topic ok");
    peers[1].engine.set_topic(b"racer's topic".to_vec()).expect("set topic ok");

    pump(&mut peers, 64, |p| {
        let topics: Vec<Option<&[u8]>> = p.iter().map(|peer| peer.engine.topic()).collect();
        topics.iter().all(|t| t.is_some()) && topics.windows(2).all(|w| w[0] == w[1])
    });

    let winner = peers[0].engine.topic().expect("topic set").to_vec();
    assert!(winner == b"founder's topic" || winner == b"racer's topic");
    for peer in &peers {
        assert_eq!(peer.engine.topic().unwrap(), winner.as_slice());
    }
}
