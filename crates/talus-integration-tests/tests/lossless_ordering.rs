//! Lossless delivery preserves the sender's order even under a burst
//! far larger than any single retransmit window (testable property 4).

use talus_engine::{EngineConfig, MessageKind};
use talus_integration_tests::{all_connected, pump, spawn_founder, spawn_joiner};
use talus_state::Privacy;
use talus_transport::LoopbackHub;

#[test]
fn test_thousand_and_one_messages_arrive_in_strictly_increasing_order() {
    let hub = LoopbackHub::new();
    let mut sender = spawn_founder(&hub, EngineConfig::default(), Privacy::Public, b"Utah Data Center", b"Winslow");
    let receiver = spawn_joiner(
        &hub,
        EngineConfig::default(),
        sender.address.clone(),
        sender.engine.own_enc_pk(),
        sender.engine.chat_id(),
        Vec::new(),
        b"Thomas",
    );

    let mut peers = vec![sender, receiver];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    sender = peers.remove(0);
    let receiver = peers.remove(0);

    const COUNT: usize = 1001;
    for i in 0..COUNT {
        sender.engine.send_message(MessageKind::Normal, i.to_string().into_bytes()).expect("send ok");
    }

    let mut peers = vec![sender, receiver];
    pump(&mut peers, COUNT * 4, |p| p[1].events.borrow().messages.len() >= COUNT);

    let receiver = &peers[1];
    let received = receiver.events.borrow();
    assert_eq!(received.messages.len(), COUNT);
    for (i, (_, kind, bytes)) in received.messages.iter().enumerate() {
        assert_eq!(*kind, MessageKind::Normal);
        let text = std::str::from_utf8(bytes).expect("utf8");
        let value: usize = text.parse().expect("decimal payload");
        assert_eq!(value, i, "message {i} arrived out of order");
    }
}
