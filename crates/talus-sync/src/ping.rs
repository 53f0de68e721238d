use serde::{Deserialize, Serialize};
use talus_types::identity::SigPublicKey;

/// Lossy group packet type, periodic (§6).
pub const PING: u8 = 0x01;

/// Order-independent 16-bit fingerprint of confirmed peers' permanent
/// signature keys (§3). XOR is commutative and self-cancelling, giving
/// order-independence without sorting the peer set on every recompute.
pub fn peer_list_checksum(confirmed_sig_pks: &[SigPublicKey]) -> u16 {
    confirmed_sig_pks.iter().fold(0u16, |acc, pk| {
        let hash = talus_crypto::blake3::hash(pk);
        acc ^ u16::from_be_bytes([hash[0], hash[1]])
    })
}

/// The version vector every confirmed link exchanges via `PING` (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionVector {
    pub peer_list_checksum: u16,
    pub confirmed_peer_count: u16,
    pub shared_state_version: u32,
    pub sanctions_credentials_version: u32,
    pub topic_version: u32,
    pub self_ip_port: Option<std::net::SocketAddr>,
}

/// Why `receive` decided the local view of `other` is out of sync (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfSyncReason {
    SharedStateBehind,
    SanctionsCredentialsBehind,
    TopicBehind,
    PeerListDiverged,
}

impl VersionVector {
    /// Componentwise comparison against the local vector. Out-of-sync if
    /// any received version is ahead of ours, or the peer-list checksum
    /// differs while the peer claims at least as many confirmed peers as
    /// we have (§4.7) — a reason list, since more than one artifact can be
    /// behind simultaneously and the sync request bitfield reports them
    /// all at once.
    pub fn out_of_sync_reasons(&self, received: &VersionVector) -> Vec<OutOfSyncReason> {
        let mut reasons = Vec::new();

        if received.shared_state_version > self.shared_state_version {
            reasons.push(OutOfSyncReason::SharedStateBehind);
        }
        if received.sanctions_credentials_version > self.sanctions_credentials_version {
            reasons.push(OutOfSyncReason::SanctionsCredentialsBehind);
        }
        if received.topic_version > self.topic_version {
            reasons.push(OutOfSyncReason::TopicBehind);
        }
        if received.peer_list_checksum != self.peer_list_checksum
            && received.confirmed_peer_count >= self.confirmed_peer_count
        {
            reasons.push(OutOfSyncReason::PeerListDiverged);
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(shared: u32, sanctions: u32, topic: u32, checksum: u16, count: u16) -> VersionVector {
        VersionVector {
            peer_list_checksum: checksum,
            confirmed_peer_count: count,
            shared_state_version: shared,
            sanctions_credentials_version: sanctions,
            topic_version: topic,
            self_ip_port: None,
        }
    }

    #[test]
    fn test_peer_list_checksum_order_independent() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(peer_list_checksum(&[a, b]), peer_list_checksum(&[b, a]));
    }

    #[test]
    fn test_in_sync_has_no_reasons() {
        let v = vector(1, 1, 1, 42, 3);
        assert!(v.out_of_sync_reasons(&v).is_empty());
    }

    #[test]
    fn test_behind_shared_state_detected() {
        let local = vector(1, 1, 1, 42, 3);
        let remote = vector(2, 1, 1, 42, 3);
        assert_eq!(local.out_of_sync_reasons(&remote), vec![OutOfSyncReason::SharedStateBehind]);
    }

    #[test]
    fn test_checksum_divergence_requires_peer_count_at_least_as_large() {
        let local = vector(1, 1, 1, 42, 3);
        let remote_fewer = vector(1, 1, 1, 99, 1);
        assert!(local.out_of_sync_reasons(&remote_fewer).is_empty());

        let remote_more = vector(1, 1, 1, 99, 5);
        assert_eq!(
            local.out_of_sync_reasons(&remote_more),
            vec![OutOfSyncReason::PeerListDiverged]
        );
    }
}
