//! # talus-persist
//!
//! Pack/unpack the saved-group record across process restarts (§6).
//! CBOR-encoded, matching the teacher's wire-format choice for
//! structured payloads elsewhere in this workspace.

mod cbor;
mod record;

pub use record::{GroupKeys, SavedGroupRecord};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("CBOR encode failed: {0}")]
    Encode(String),
    #[error("CBOR decode failed: {0}")]
    Decode(String),
    #[error("nickname exceeds {} bytes (got {len})", talus_types::limits::MAX_NICK_LEN)]
    NickTooLong { len: usize },
    #[error("password exceeds {} bytes (got {len})", talus_types::limits::MAX_PASSWORD_LEN)]
    PasswordTooLong { len: usize },
}
