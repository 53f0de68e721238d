/// Public-operation error taxonomy (§7). Crypto/integrity failures
/// discovered while processing untrusted packets never surface here —
/// they are logged and the packet is dropped, or reported asynchronously
/// through [`crate::GroupHandler::on_peer_exit`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // Input errors
    #[error("value exceeds its maximum length")]
    TooLong,
    #[error("value must not be empty")]
    Empty,
    #[error("requested role is not assignable this way")]
    InvalidRole,
    #[error("chat id does not match the target group")]
    BadChatId,
    #[error("invite cookie is invalid or expired")]
    BadInvite,

    // State errors
    #[error("no group with that id is known to this engine")]
    GroupNotFound,
    #[error("no such peer in this group")]
    PeerNotFound,
    #[error("already disconnected from this group")]
    AlreadyDisconnected,
    #[error("not connected to this group")]
    NotConnected,
    #[error("operation cannot target the caller")]
    TargetIsSelf,
    #[error("already a member of this group")]
    Duplicate,

    // Permission errors
    #[error("caller's role does not permit this operation")]
    PermissionDenied,
    #[error("only the founder may perform this operation")]
    NotFounder,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why an in-flight join attempt failed, delivered via
/// [`crate::GroupHandler::on_join_fail`] rather than a `Result`, since
/// the outcome is only known after the handshake completes over the
/// network (§7 "network outcome errors").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinFailReason {
    NameTaken,
    PeerLimitReached,
    InvalidPassword,
    Unknown,
}

/// Why a confirmed peer left the peer table, delivered via
/// [`crate::GroupHandler::on_peer_exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerExitReason {
    Quit,
    Timeout,
    Disconnected,
    SelfDisconnected,
    Kick,
    SyncError,
}
