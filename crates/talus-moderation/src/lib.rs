//! # talus-moderation
//!
//! Moderator list, sanctions list, and the role lattice enforcement that
//! sits between them (§4.5).

mod sanctions;
mod state;

pub use sanctions::{SanctionsCredentials, SanctionsEntry, SanctionsList};
pub use state::{ModerationState, ModeratorList, SetRoleOutcome};

/// `SET_MOD` / `SET_OBSERVER` flag: whether a role change promotes or
/// demotes relative to the target's current role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleChangeFlag {
    Promote,
    Demote,
}

impl RoleChangeFlag {
    pub fn to_byte(self) -> u8 {
        match self {
            RoleChangeFlag::Promote => 0,
            RoleChangeFlag::Demote => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RoleChangeFlag::Promote),
            1 => Some(RoleChangeFlag::Demote),
            _ => None,
        }
    }
}

/// `SET_MOD`, `SET_OBSERVER`, and `KICK_PEER` are subtypes of the `BROADCAST`
/// (0xf3) group packet type, not standalone types — these are their
/// `subtype` byte values (§6).
pub const BROADCAST_SUBTYPE_KICK_PEER: u8 = 0x06;
pub const BROADCAST_SUBTYPE_SET_MOD: u8 = 0x07;
pub const BROADCAST_SUBTYPE_SET_OBSERVER: u8 = 0x08;

/// Standalone lossless group packet types for full-list synchronization
/// (§6, driven by `talus-sync`).
pub const MOD_LIST: u8 = 0xfc;
pub const SANCTIONS_LIST: u8 = 0xfd;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("caller's role does not permit this change")]
    PermissionDenied,

    #[error("new role must not be Founder")]
    InvalidRole,

    #[error("caller targeted themselves")]
    TargetIsSelf,

    #[error("signature verification failed")]
    BadSignature,

    #[error("sanctioner is not currently founder or moderator")]
    UnauthorizedSanctioner,
}

pub type Result<T> = std::result::Result<T, ModerationError>;
