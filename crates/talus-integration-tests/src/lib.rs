//! Shared harness for driving two or more [`talus_engine::GroupEngine`]
//! instances end to end over an in-memory transport, without a running
//! daemon process.
//!
//! Every test in this crate follows the same shape: register one
//! [`talus_transport::LoopbackHub`] node per peer, call the engines'
//! public operations, and repeatedly call [`pump`] to carry bytes
//! between them until a caller-supplied predicate is satisfied or a
//! bounded step count runs out (a failure, never an infinite loop).

use std::cell::RefCell;
use std::rc::Rc;

use talus_engine::{EngineConfig, GroupEngine, GroupHandler, MessageKind, PeerExitReason};
use talus_persist::SavedGroupRecord;
use talus_state::Privacy;
use talus_transport::{LoopbackHub, LoopbackNode, PeerAddress, TransportAdapter};
use talus_types::{ChatId, EncPublicKey, PeerId, Role};

/// Everything a [`RecordingHandler`] has observed so far, readable from
/// the test after the handler has been moved into a [`GroupEngine`].
#[derive(Default)]
pub struct Events {
    pub messages: Vec<(PeerId, MessageKind, Vec<u8>)>,
    pub private_messages: Vec<(PeerId, MessageKind, Vec<u8>)>,
    pub custom_packets: Vec<(PeerId, Vec<u8>)>,
    pub peer_joins: Vec<PeerId>,
    pub peer_exits: Vec<(PeerId, PeerExitReason)>,
    pub moderation_events: Vec<(PeerId, PeerId, Role)>,
    pub topic_changes: Vec<(PeerId, Vec<u8>)>,
    pub join_fails: usize,
}

/// A [`GroupHandler`] that records every upcall instead of acting on it,
/// shared via `Rc<RefCell<_>>` so the test retains a handle after the
/// handler itself has moved into a [`GroupEngine`].
#[derive(Clone, Default)]
pub struct RecordingHandler {
    pub events: Rc<RefCell<Events>>,
}

impl GroupHandler for RecordingHandler {
    fn on_message(&mut self, from: PeerId, kind: MessageKind, bytes: &[u8]) {
        self.events.borrow_mut().messages.push((from, kind, bytes.to_vec()));
    }

    fn on_private_message(&mut self, from: PeerId, kind: MessageKind, bytes: &[u8]) {
        self.events.borrow_mut().private_messages.push((from, kind, bytes.to_vec()));
    }

    fn on_custom_packet(&mut self, from: PeerId, bytes: &[u8]) {
        self.events.borrow_mut().custom_packets.push((from, bytes.to_vec()));
    }

    fn on_peer_join(&mut self, peer: PeerId) {
        self.events.borrow_mut().peer_joins.push(peer);
    }

    fn on_peer_exit(&mut self, peer: PeerId, reason: PeerExitReason) {
        self.events.borrow_mut().peer_exits.push((peer, reason));
    }

    fn on_moderation_event(&mut self, actor: PeerId, target: PeerId, new_role: Role) {
        self.events.borrow_mut().moderation_events.push((actor, target, new_role));
    }

    fn on_topic_change(&mut self, setter: PeerId, topic: &[u8]) {
        self.events.borrow_mut().topic_changes.push((setter, topic.to_vec()));
    }

    fn on_join_fail(&mut self, _reason: talus_engine::JoinFailReason) {
        self.events.borrow_mut().join_fails += 1;
    }
}

pub type Engine = GroupEngine<RecordingHandler>;

/// One peer's engine, its loopback node, and its own observed events.
pub struct Peer {
    pub engine: Engine,
    pub node: LoopbackNode,
    pub address: PeerAddress,
    pub events: Rc<RefCell<Events>>,
}

pub fn spawn_founder(hub: &LoopbackHub, config: EngineConfig, privacy: Privacy, group_name: &[u8], nickname: &[u8]) -> Peer {
    let handler = RecordingHandler::default();
    let events = Rc::clone(&handler.events);
    let engine = GroupEngine::create_group(config, handler, privacy, group_name.to_vec(), nickname.to_vec()).expect("create group");
    let (node, address) = hub.register(engine.own_enc_pk());
    Peer { engine, node, address, events }
}

pub fn spawn_joiner(
    hub: &LoopbackHub,
    config: EngineConfig,
    target_address: PeerAddress,
    target_enc_pk: EncPublicKey,
    chat_id: ChatId,
    password: Vec<u8>,
    nickname: &[u8],
) -> Peer {
    let handler = RecordingHandler::default();
    let events = Rc::clone(&handler.events);
    let (node, address) = hub.register([0u8; 32]);
    let engine = GroupEngine::join_by_chat_id(config, handler, chat_id, target_address, target_enc_pk, password, nickname.to_vec())
        .expect("begin join");
    Peer { engine, node, address, events }
}

/// Carry pending bytes between every peer in `peers`, in both
/// directions, until `converged` is satisfied or `max_steps` rounds
/// have run. Panics rather than looping forever, per this workspace's
/// testing policy (§8): a scenario that never converges is a test
/// failure, not a hang.
/// Rejoin a group from a previously [`save`](talus_engine::GroupEngine::save)d
/// record, over a fresh loopback node — the caller's identity is preserved
/// across the restart, unlike [`spawn_joiner`].
pub fn resume_peer(
    hub: &LoopbackHub,
    config: EngineConfig,
    record: SavedGroupRecord,
    target_address: PeerAddress,
    target_enc_pk: EncPublicKey,
) -> Peer {
    let handler = RecordingHandler::default();
    let events = Rc::clone(&handler.events);
    let (node, address) = hub.register([0u8; 32]);
    let engine = GroupEngine::resume(config, handler, record, target_address, target_enc_pk).expect("resume ok");
    Peer { engine, node, address, events }
}

pub fn pump(peers: &mut [Peer], max_steps: usize, mut converged: impl FnMut(&[Peer]) -> bool) {
    for _ in 0..max_steps {
        for peer in peers.iter_mut() {
            peer.engine.iterate();
        }
        for peer in peers.iter_mut() {
            for (addr, bytes) in peer.engine.pending_outbound() {
                let _ = peer.node.send(&addr, bytes);
            }
        }
        for peer in peers.iter_mut() {
            let inbound = peer.node.poll_inbound();
            for (from, bytes) in inbound {
                peer.engine.receive(from, bytes);
            }
        }
        if converged(peers) {
            return;
        }
    }
    panic!("scenario did not converge within the step budget");
}

/// Like [`pump`], but for scenarios with no convergence predicate to
/// wait on (e.g. asserting that something does *not* arrive) — relays
/// for exactly `rounds` rounds and always returns.
pub fn pump_rounds(peers: &mut [Peer], rounds: usize) {
    for _ in 0..rounds {
        for peer in peers.iter_mut() {
            for (addr, bytes) in peer.engine.pending_outbound() {
                let _ = peer.node.send(&addr, bytes);
            }
        }
        for peer in peers.iter_mut() {
            let inbound = peer.node.poll_inbound();
            for (from, bytes) in inbound {
                peer.engine.receive(from, bytes);
            }
        }
    }
}

/// `iterate()` on every peer once, draining whatever it queues.
pub fn iterate_all(peers: &mut [Peer]) {
    for peer in peers.iter_mut() {
        peer.engine.iterate();
    }
}

pub fn all_connected(peers: &[Peer]) -> bool {
    peers.iter().all(|p| p.engine.is_connected())
}

/// True once every peer reports exactly `count` confirmed peers — the
/// shape of a fully meshed group of `count + 1` members.
pub fn fully_meshed(peers: &[Peer], count: usize) -> bool {
    peers.iter().all(|p| p.engine.peer_count() == count)
}
