use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

const ACK_REQ_RATE_LIMIT: Duration = Duration::from_secs(1);

/// What the caller should do after feeding a packet into [`ReceiveWindow`].
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// `message_id` matched `next_expected`: these payloads (the packet
    /// itself plus any buffered successors it unblocked) are now
    /// deliverable in order. Reply `MESSAGE_ACK { ack_id, Recv }`.
    Delivered {
        delivered: Vec<(u8, Vec<u8>)>,
        ack_id: u64,
    },
    /// `message_id` is ahead of `next_expected`: buffered for later. Reply
    /// `MESSAGE_ACK { next_expected, Req }` unless rate-limited.
    BufferedOutOfOrder { ack_req_id: Option<u64> },
    /// `message_id` is behind `next_expected`: a duplicate or a stale ack
    /// race. Reply `MESSAGE_ACK { message_id, Recv }` anyway and drop.
    DuplicateOrOld { ack_id: u64 },
}

/// The incoming side of a [`crate::LosslessChannel`]: strict delivery
/// order per sender, with an out-of-order buffer and rate-limited
/// retransmission requests.
pub struct ReceiveWindow {
    next_expected: u64,
    buffered: BTreeMap<u64, (u8, Vec<u8>)>,
    last_ack_req: HashMap<u64, Instant>,
}

impl Default for ReceiveWindow {
    fn default() -> Self {
        Self {
            next_expected: 1,
            buffered: BTreeMap::new(),
            last_ack_req: HashMap::new(),
        }
    }
}

impl ReceiveWindow {
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn receive(
        &mut self,
        message_id: u64,
        group_packet_type: u8,
        payload: Vec<u8>,
        now: Instant,
    ) -> ReceiveOutcome {
        use std::cmp::Ordering;

        match message_id.cmp(&self.next_expected) {
            Ordering::Equal => {
                let mut delivered = vec![(group_packet_type, payload)];
                self.next_expected += 1;
                while let Some(next) = self.buffered.remove(&self.next_expected) {
                    delivered.push(next);
                    self.next_expected += 1;
                }
                ReceiveOutcome::Delivered {
                    delivered,
                    ack_id: message_id,
                }
            }
            Ordering::Greater => {
                self.buffered.insert(message_id, (group_packet_type, payload));
                let rate_limited = self
                    .last_ack_req
                    .get(&message_id)
                    .is_some_and(|last| now.duration_since(*last) < ACK_REQ_RATE_LIMIT);
                if rate_limited {
                    ReceiveOutcome::BufferedOutOfOrder { ack_req_id: None }
                } else {
                    self.last_ack_req.insert(message_id, now);
                    ReceiveOutcome::BufferedOutOfOrder {
                        ack_req_id: Some(self.next_expected),
                    }
                }
            }
            Ordering::Less => ReceiveOutcome::DuplicateOrOld { ack_id: message_id },
        }
    }
}
