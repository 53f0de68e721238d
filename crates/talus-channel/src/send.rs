use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 8;

struct SentEntry {
    group_packet_type: u8,
    payload: Vec<u8>,
    attempts: u32,
    backoff: Duration,
    next_retry: Instant,
}

/// The outgoing side of a [`crate::LosslessChannel`]: a monotonic
/// `message_id` counter and the window of unacknowledged sends.
pub struct SendWindow {
    next_id: u64,
    entries: BTreeMap<u64, SentEntry>,
}

impl Default for SendWindow {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

/// Packets due for retransmission, plus whether the link has exceeded its
/// max-attempts ceiling and should be torn down.
pub struct RetransmitReport {
    pub to_resend: Vec<(u64, u8, Vec<u8>)>,
    pub link_failed: bool,
}

impl SendWindow {
    pub fn queue(&mut self, group_packet_type: u8, payload: Vec<u8>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            SentEntry {
                group_packet_type,
                payload,
                attempts: 0,
                backoff: INITIAL_BACKOFF,
                next_retry: now + INITIAL_BACKOFF,
            },
        );
        id
    }

    pub fn ack_recv(&mut self, message_id: u64) {
        self.entries.remove(&message_id);
    }

    pub fn ack_req(&mut self, message_id: u64, now: Instant) -> Option<(u8, Vec<u8>)> {
        let entry = self.entries.get_mut(&message_id)?;
        entry.next_retry = now + entry.backoff;
        Some((entry.group_packet_type, entry.payload.clone()))
    }

    pub fn due_retransmits(&mut self, now: Instant) -> RetransmitReport {
        let mut to_resend = Vec::new();
        let mut link_failed = false;

        for (id, entry) in self.entries.iter_mut() {
            if now < entry.next_retry {
                continue;
            }
            entry.attempts += 1;
            if entry.attempts > MAX_ATTEMPTS {
                link_failed = true;
                continue;
            }
            entry.backoff = (entry.backoff * 2).min(MAX_BACKOFF);
            entry.next_retry = now + entry.backoff;
            to_resend.push((*id, entry.group_packet_type, entry.payload.clone()));
        }

        RetransmitReport {
            to_resend,
            link_failed,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_monotonic_from_one() {
        let mut window = SendWindow::default();
        let now = Instant::now();
        assert_eq!(window.queue(0xf3, vec![1], now), 1);
        assert_eq!(window.queue(0xf3, vec![2], now), 2);
    }

    #[test]
    fn test_ack_recv_removes_from_window() {
        let mut window = SendWindow::default();
        let now = Instant::now();
        let id = window.queue(0xf3, vec![1], now);
        window.ack_recv(id);
        assert_eq!(window.pending_count(), 0);
    }

    #[test]
    fn test_retransmit_backs_off_and_eventually_fails() {
        let mut window = SendWindow::default();
        let mut now = Instant::now();
        window.queue(0xf3, vec![1], now);

        let mut failed = false;
        for _ in 0..(MAX_ATTEMPTS + 2) {
            now += MAX_BACKOFF + Duration::from_secs(1);
            let report = window.due_retransmits(now);
            if report.link_failed {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_ack_req_returns_payload_for_pending_id() {
        let mut window = SendWindow::default();
        let now = Instant::now();
        let id = window.queue(0xf3, vec![9, 9], now);
        assert_eq!(window.ack_req(id, now), Some((0xf3, vec![9, 9])));
        assert_eq!(window.ack_req(id + 1, now), None);
    }
}
