//! # talus-channel
//!
//! Per-link reliable ordered delivery on top of an unreliable datagram
//! substrate (§4.3). One [`LosslessChannel`] per confirmed peer link.

mod ack;
mod recv;
mod send;

pub use ack::{AckKind, MESSAGE_ACK};
pub use recv::{ReceiveOutcome, ReceiveWindow};
pub use send::{RetransmitReport, SendWindow};

use std::time::Instant;

/// Independent send and receive sides of one peer's lossless channel.
#[derive(Default)]
pub struct LosslessChannel {
    send: SendWindow,
    recv: ReceiveWindow,
}

impl LosslessChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next `message_id` and hold the payload in the send window
    /// until it is acked.
    pub fn queue_send(&mut self, group_packet_type: u8, payload: Vec<u8>, now: Instant) -> u64 {
        self.send.queue(group_packet_type, payload, now)
    }

    pub fn on_receive(
        &mut self,
        message_id: u64,
        group_packet_type: u8,
        payload: Vec<u8>,
        now: Instant,
    ) -> ReceiveOutcome {
        self.recv.receive(message_id, group_packet_type, payload, now)
    }

    pub fn on_ack_recv(&mut self, message_id: u64) {
        self.send.ack_recv(message_id);
    }

    /// Returns the payload to retransmit if `message_id` is still
    /// unacknowledged in the send window.
    pub fn on_ack_req(&mut self, message_id: u64, now: Instant) -> Option<(u8, Vec<u8>)> {
        self.send.ack_req(message_id, now)
    }

    /// Packets whose retransmit deadline has passed. If any entry has
    /// exceeded the max-attempts ceiling, `link_failed` is set and the
    /// caller should tear the link down (§4.3).
    pub fn due_retransmits(&mut self, now: Instant) -> RetransmitReport {
        self.send.due_retransmits(now)
    }

    pub fn next_expected(&self) -> u64 {
        self.recv.next_expected()
    }
}
