use serde::{Deserialize, Serialize};

use talus_link::HandshakeHello;
use talus_types::Role;

/// `INVITE_REQUEST` body (§6: `{ name_len, name, password }`, extended
/// with the handshake identity this workspace's key-exchange design
/// needs to compute the final session key).
#[derive(Clone, Serialize, Deserialize)]
pub struct InviteRequestBody {
    pub hello: HandshakeHello,
    pub group_name: Vec<u8>,
    pub password: Vec<u8>,
    pub nickname: Vec<u8>,
}

/// `INVITE_RESPONSE` body. The literal wire table lists this packet as
/// empty, but every responder must still tell the initiator its
/// permanent identity and assigned role; this workspace folds
/// `PEER_INFO_RESPONSE`'s content into the accept response rather than
/// running a fourth round-trip.
#[derive(Clone, Serialize, Deserialize)]
pub struct InviteResponseBody {
    pub hello: HandshakeHello,
    pub assigned_role: Role,
}
