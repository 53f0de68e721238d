use serde::{Deserialize, Serialize};

use talus_moderation::ModeratorList;
use talus_state::SharedState;
use talus_topic::TopicInfo;
use talus_types::limits::{MAX_NICK_LEN, MAX_PASSWORD_LEN};

use crate::cbor;
use crate::PersistError;

/// The founder's group signature and encryption secrets. Absent for
/// every non-founder member — the group's public identity (the chat
/// ID) is carried inside `shared_state` regardless of who persists it.
#[derive(Clone, Serialize, Deserialize)]
pub struct GroupKeys {
    pub sig_secret: [u8; 32],
    pub enc_secret: [u8; 32],
}

/// Everything a peer needs to restore a group membership across a
/// process restart (§6 persistence layout). The sanctions list is
/// deliberately absent: it resets whenever the group empties, per §3.
#[derive(Clone, Serialize, Deserialize)]
pub struct SavedGroupRecord {
    /// This peer's permanent encryption secret (handshake identity).
    pub own_enc_secret: [u8; 32],
    /// This peer's permanent signature secret (group identity).
    pub own_sig_secret: [u8; 32],
    /// Present only if this peer founded the group.
    pub group_keys: Option<GroupKeys>,
    pub shared_state: SharedState,
    pub moderator_list: ModeratorList,
    pub nick: Vec<u8>,
    pub password: Vec<u8>,
    pub topic_info: Option<TopicInfo>,
    /// Whether the engine should attempt to reconnect on load, or stay
    /// offline until the caller explicitly connects.
    pub connect_on_load: bool,
}

impl SavedGroupRecord {
    pub fn pack(&self) -> Result<Vec<u8>, PersistError> {
        if self.nick.len() > MAX_NICK_LEN {
            return Err(PersistError::NickTooLong { len: self.nick.len() });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(PersistError::PasswordTooLong { len: self.password.len() });
        }
        cbor::to_vec(self)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self, PersistError> {
        let record: Self = cbor::from_slice(bytes)?;
        if record.nick.len() > MAX_NICK_LEN {
            return Err(PersistError::NickTooLong { len: record.nick.len() });
        }
        if record.password.len() > MAX_PASSWORD_LEN {
            return Err(PersistError::PasswordTooLong { len: record.password.len() });
        }
        Ok(record)
    }
}
