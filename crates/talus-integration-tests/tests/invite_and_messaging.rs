//! Invite, message, ignore, private, and custom-packet round trips
//! across a freshly invited pair, ending in a clean teardown.

use talus_engine::{EngineConfig, EngineError, MessageKind};
use talus_integration_tests::{all_connected, pump, pump_rounds, spawn_founder, spawn_joiner, Peer};
use talus_state::Privacy;
use talus_transport::LoopbackHub;

fn connected_pair() -> (Peer, Peer) {
    let hub = LoopbackHub::new();
    let winslow = spawn_founder(&hub, EngineConfig::default(), Privacy::Private, b"Utah Data Center", b"Winslow");
    let thomas = spawn_joiner(
        &hub,
        EngineConfig::default(),
        winslow.address.clone(),
        winslow.engine.own_enc_pk(),
        winslow.engine.chat_id(),
        Vec::new(),
        b"Thomas",
    );
    let mut peers = vec![winslow, thomas];
    pump(&mut peers, 32, |p| all_connected(p) && p.iter().all(|peer| peer.engine.peer_count() == 1));
    let mut iter = peers.into_iter();
    (iter.next().unwrap(), iter.next().unwrap())
}

#[test]
fn test_invite_completes_and_both_sides_see_one_confirmed_peer() {
    let (winslow, thomas) = connected_pair();
    assert_eq!(winslow.engine.peer_count(), 1);
    assert_eq!(thomas.engine.peer_count(), 1);
}

#[test]
fn test_plain_message_is_delivered() {
    let (mut winslow, mut thomas) = connected_pair();
    winslow
        .engine
        .send_message(MessageKind::Normal, b"Where is it I've read that the dying, or the dead...".to_vec())
        .expect("send ok");

    let mut peers = vec![winslow, thomas];
    pump(&mut peers, 32, |p| !p[1].events.borrow().messages.is_empty());
    winslow = peers.remove(0);
    thomas = peers.remove(0);

    let received = thomas.events.borrow();
    assert_eq!(received.messages.len(), 1);
    assert_eq!(received.messages[0].1, MessageKind::Normal);
    let _ = winslow;
}

#[test]
fn test_ignored_peer_messages_are_not_delivered() {
    let (mut winslow, mut thomas) = connected_pair();
    let target = winslow.engine.peer_ids()[0];
    winslow.engine.toggle_ignore(target, true).expect("ignore ok");

    thomas.engine.send_message(MessageKind::Normal, b"Am I bothering you?".to_vec()).expect("send ok");
    let mut peers = vec![winslow, thomas];
    pump_rounds(&mut peers, 8);
    winslow = peers.remove(0);
    thomas = peers.remove(0);

    assert!(winslow.events.borrow().messages.is_empty());

    winslow.engine.toggle_ignore(target, false).expect("unignore ok");
    let _ = thomas;
}

#[test]
fn test_unignored_private_action_message_is_delivered_verbatim() {
    let (mut winslow, mut thomas) = connected_pair();
    let target = winslow.engine.peer_ids()[0];

    winslow
        .engine
        .send_private(target, MessageKind::Action, b"Don't spill yer beans".to_vec())
        .expect("send private ok");

    let mut peers = vec![winslow, thomas];
    pump(&mut peers, 32, |p| !p[1].events.borrow().private_messages.is_empty());
    winslow = peers.remove(0);
    thomas = peers.remove(0);

    let received = thomas.events.borrow();
    assert_eq!(received.private_messages.len(), 1);
    assert_eq!(received.private_messages[0].1, MessageKind::Action);
    assert_eq!(received.private_messages[0].2, b"Don't spill yer beans");
    let _ = winslow;
}

#[test]
fn test_reliable_and_lossy_custom_packets_both_arrive() {
    let (mut winslow, mut thomas) = connected_pair();
    winslow.engine.send_custom(true, b"Why'd ya spill yer beans?".to_vec()).expect("reliable custom ok");
    winslow.engine.send_custom(false, b"Why'd ya spill yer beans?".to_vec()).expect("lossy custom ok");

    let mut peers = vec![winslow, thomas];
    pump(&mut peers, 32, |p| p[1].events.borrow().custom_packets.len() >= 2);
    winslow = peers.remove(0);
    thomas = peers.remove(0);

    let received = thomas.events.borrow();
    assert_eq!(received.custom_packets.len(), 2);
    assert!(received.custom_packets.iter().all(|(_, bytes)| bytes == b"Why'd ya spill yer beans?"));
    let _ = winslow;
}

#[test]
fn test_leave_on_both_sides_tears_down_cleanly() {
    let (mut winslow, mut thomas) = connected_pair();
    assert!(winslow.engine.leave(None).is_ok());
    assert!(thomas.engine.leave(None).is_ok());
    assert!(matches!(winslow.engine.send_message(MessageKind::Normal, b"hi".to_vec()), Err(EngineError::NotConnected)));
}
