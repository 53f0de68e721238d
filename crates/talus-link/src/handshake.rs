//! Handshake packet type bytes and payloads (§4.2, §6).

use serde::{Deserialize, Serialize};
use talus_types::identity::{EncPublicKey, SigPublicKey};

/// Lossless, no `message_id`: acknowledges the handshake and switches the
/// link onto the derived session key for everything that follows.
pub const HS_RESPONSE_ACK: u8 = 0xff;

/// Lossless: `{ name_len:2, name, password:32 }`.
pub const INVITE_REQUEST: u8 = 0xf6;

/// Lossless, empty body.
pub const INVITE_RESPONSE: u8 = 0xf7;

/// Lossy: `{ reason:1 }`.
pub const INVITE_RESPONSE_REJECT: u8 = 0x03;

/// Lossless, empty body.
pub const PEER_INFO_REQUEST: u8 = 0xf4;

/// Lossless: `{ password:32, name_len:2, name:128, status:1, role:1 }`.
pub const PEER_INFO_RESPONSE: u8 = 0xf5;

/// Reason a responder declines [`INVITE_REQUEST`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InviteRejectReason {
    NickTaken,
    GroupFull,
    InvalidPassword,
    InviteFailed,
}

impl InviteRejectReason {
    pub fn to_byte(self) -> u8 {
        match self {
            InviteRejectReason::NickTaken => 0x00,
            InviteRejectReason::GroupFull => 0x01,
            InviteRejectReason::InvalidPassword => 0x02,
            InviteRejectReason::InviteFailed => 0x03,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => InviteRejectReason::NickTaken,
            0x01 => InviteRejectReason::GroupFull,
            0x02 => InviteRejectReason::InvalidPassword,
            _ => InviteRejectReason::InviteFailed,
        }
    }
}

/// The payload sealed inside the very first handshake packet, under the
/// bootstrap key (§4.2 step 1): the sender's permanent identity, bound to
/// the ephemeral key already visible in the packet's plaintext header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandshakeHello {
    pub permanent_enc_pk: EncPublicKey,
    pub permanent_sig_pk: SigPublicKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_reject_reason_roundtrip() {
        for r in [
            InviteRejectReason::NickTaken,
            InviteRejectReason::GroupFull,
            InviteRejectReason::InvalidPassword,
            InviteRejectReason::InviteFailed,
        ] {
            assert_eq!(InviteRejectReason::from_byte(r.to_byte()), r);
        }
    }
}
