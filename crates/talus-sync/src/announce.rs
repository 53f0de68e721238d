use serde::{Deserialize, Serialize};
use talus_types::identity::{EncPublicKey, SigPublicKey};

/// Lossless: `{ flags:2, password:32 }` (§6).
pub const SYNC_REQUEST: u8 = 0xf8;

/// Lossless: one packed peer announce per response packet (§6).
pub const SYNC_RESPONSE: u8 = 0xf9;

/// This workspace carries a single canonical announce layout gated by a
/// `schema_version` byte rather than the wire's legacy/modern two-variant
/// announce packet (see DESIGN.md for the resolved open question): there
/// is exactly one `PeerAnnounce` shape, and `schema_version` exists only
/// so a future incompatible change has somewhere to branch.
pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Which artifacts a `SYNC_REQUEST` asks the peer to resend (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequestFlags(u16);

impl SyncRequestFlags {
    pub const PEER_LIST: SyncRequestFlags = SyncRequestFlags(1 << 0);
    pub const TOPIC: SyncRequestFlags = SyncRequestFlags(1 << 2);
    pub const STATE: SyncRequestFlags = SyncRequestFlags(1 << 4);
    pub const EMPTY: SyncRequestFlags = SyncRequestFlags(0);

    pub fn contains(self, flag: SyncRequestFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Self {
        SyncRequestFlags(bits)
    }
}

impl std::ops::BitOr for SyncRequestFlags {
    type Output = SyncRequestFlags;
    fn bitor(self, rhs: Self) -> Self {
        SyncRequestFlags(self.0 | rhs.0)
    }
}

/// A relay reachable over TCP, used when a peer has no direct UDP path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TcpRelay {
    pub addr: std::net::SocketAddr,
}

/// Enough information for the requester to initiate a handshake with a
/// peer it does not yet know (§4.7, `SYNC_RESPONSE`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerAnnounce {
    pub schema_version: u8,
    pub permanent_enc_pk: EncPublicKey,
    pub permanent_sig_pk: SigPublicKey,
    pub direct_addr: Option<std::net::SocketAddr>,
    pub tcp_relays: Vec<TcpRelay>,
}

impl PeerAnnounce {
    pub fn new(
        permanent_enc_pk: EncPublicKey,
        permanent_sig_pk: SigPublicKey,
        direct_addr: Option<std::net::SocketAddr>,
        tcp_relays: Vec<TcpRelay>,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            permanent_enc_pk,
            permanent_sig_pk,
            direct_addr,
            tcp_relays,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.direct_addr.is_some() || !self.tcp_relays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_request_flags_combine() {
        let flags = SyncRequestFlags::PEER_LIST | SyncRequestFlags::STATE;
        assert!(flags.contains(SyncRequestFlags::PEER_LIST));
        assert!(flags.contains(SyncRequestFlags::STATE));
        assert!(!flags.contains(SyncRequestFlags::TOPIC));
    }

    #[test]
    fn test_peer_announce_reachability() {
        let unreachable = PeerAnnounce::new([1u8; 32], [2u8; 32], None, vec![]);
        assert!(!unreachable.is_reachable());

        let reachable = PeerAnnounce::new([1u8; 32], [2u8; 32], Some("127.0.0.1:33445".parse().expect("valid")), vec![]);
        assert!(reachable.is_reachable());
    }

    #[test]
    fn test_current_schema_version_stamped() {
        let announce = PeerAnnounce::new([0u8; 32], [0u8; 32], None, vec![]);
        assert_eq!(announce.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
