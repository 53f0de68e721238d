use talus_types::{PeerId, PeerStatus, Role};

use crate::error::{JoinFailReason, PeerExitReason};

/// Which of the two free-text message operations produced a delivered
/// message (§6 `BROADCAST` subtypes `PLAIN_MESSAGE` / `ACTION_MESSAGE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Action,
}

/// Capability the surrounding application injects into [`crate::GroupEngine`]
/// to observe events, matching the teacher's pattern of injected
/// capability traits rather than a registered callback table. Every
/// method is default-implemented as a no-op so callers only override
/// what they care about.
pub trait GroupHandler {
    fn on_message(&mut self, _from: PeerId, _kind: MessageKind, _bytes: &[u8]) {}
    fn on_private_message(&mut self, _from: PeerId, _kind: MessageKind, _bytes: &[u8]) {}
    fn on_custom_packet(&mut self, _from: PeerId, _bytes: &[u8]) {}
    fn on_peer_join(&mut self, _peer: PeerId) {}
    fn on_peer_exit(&mut self, _peer: PeerId, _reason: PeerExitReason) {}
    fn on_moderation_event(&mut self, _actor: PeerId, _target: PeerId, _new_role: Role) {}
    fn on_nick_change(&mut self, _peer: PeerId, _nick: &[u8]) {}
    fn on_status_change(&mut self, _peer: PeerId, _status: PeerStatus) {}
    fn on_topic_change(&mut self, _setter: PeerId, _topic: &[u8]) {}
    fn on_password_change(&mut self) {}
    fn on_privacy_state_change(&mut self) {}
    fn on_peer_limit_change(&mut self, _new_limit: u32) {}
    fn on_self_join(&mut self) {}
    fn on_join_fail(&mut self, _reason: JoinFailReason) {}
}

/// A [`GroupHandler`] that observes nothing. Useful for tests driving the
/// engine purely through its public operations.
#[derive(Default)]
pub struct NullHandler;

impl GroupHandler for NullHandler {}
