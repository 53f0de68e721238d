use serde::{Deserialize, Serialize};

/// Opaque application bytes delivered through `send_custom` (§6).
pub const CUSTOM_PACKET: u8 = 0xf2;

/// `{ subtype:1, ts:8, payload }` (§6). Everything the application and
/// the moderation layer fan out to every confirmed peer rides inside
/// one of these, distinguished by `subtype`.
pub const BROADCAST: u8 = 0xf3;

pub const BROADCAST_SUBTYPE_STATUS: u8 = 0x01;
pub const BROADCAST_SUBTYPE_NICK: u8 = 0x02;
pub const BROADCAST_SUBTYPE_PLAIN_MESSAGE: u8 = 0x03;
pub const BROADCAST_SUBTYPE_ACTION_MESSAGE: u8 = 0x04;
pub const BROADCAST_SUBTYPE_PRIVATE_MESSAGE: u8 = 0x05;
// 0x06 KICK_PEER, 0x07 SET_MOD, 0x08 SET_OBSERVER are defined in
// `talus_moderation` — they're its concern, not the engine's.
pub const BROADCAST_SUBTYPE_PEER_EXIT: u8 = 0x09;

/// The decoded form of a `BROADCAST` packet's encrypted body.
#[derive(Clone, Serialize, Deserialize)]
pub struct BroadcastBody {
    pub subtype: u8,
    pub timestamp: u64,
    pub payload: Vec<u8>,
}
