//! # talus-link
//!
//! Per-pair session state: handshake progression, ephemeral key exchange,
//! and the derived symmetric session key (§4.2).
//!
//! [`PeerLink`] is a pure state machine — it never touches the network.
//! Callers seal/open the actual handshake packets with `talus-codec` using
//! the keys this crate derives, and drive state transitions from the
//! result.

mod handshake;
mod link;

pub use handshake::{
    InviteRejectReason, HandshakeHello, HS_RESPONSE_ACK, INVITE_REQUEST, INVITE_RESPONSE,
    INVITE_RESPONSE_REJECT, PEER_INFO_REQUEST, PEER_INFO_RESPONSE,
};
pub use link::PeerLink;

/// Errors raised by the handshake state machine.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A handshake message arrived out of order for the link's current state.
    #[error("handshake message arrived in state {state:?}, expected further along")]
    OutOfSequence { state: talus_types::ConnectionState },

    /// The peer's declared ephemeral key was needed before it was learned.
    #[error("peer ephemeral key not yet known")]
    EphemeralKeyUnknown,

    /// The peer's permanent encryption key was needed before it was learned.
    #[error("peer permanent key not yet known")]
    PermanentKeyUnknown,

    /// Responder rejected the invite.
    #[error("invite rejected: {0:?}")]
    InviteRejected(InviteRejectReason),
}

/// Convenience result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;
