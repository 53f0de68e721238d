//! # talus-codec
//!
//! Frames and unframes a single group packet (§4.1).
//!
//! ```text
//! [outer_type:1][chat_id_hash:4][sender_enc_pk:32][nonce:24]
//! AEAD{ group_packet_type:1 || (message_id:8 if lossless) || payload || padding[0..8] }
//! ```
//!
//! The plaintext header is never encrypted — it exists so a receiver can
//! drop packets for the wrong group (`chat_id_hash`) and look up the
//! right per-pair session key (`sender_enc_pk`) before spending a single
//! AEAD operation. Everything after the header is sealed with
//! XChaCha20-Poly1305 keyed by that session key, with the plaintext
//! header bytes as additional authenticated data.
//!
//! Padding trails the payload rather than leading it (see `seal`):
//! CBOR payloads are self-delimiting, so a decoder stops reading the
//! payload at its own end and never needs a length to skip leading
//! padding first.

mod header;
mod seal;

pub use header::{chat_id_hash, OuterHeader, OuterType, PLAINTEXT_HEADER_LEN};
pub use seal::{open, seal, DecodedPacket};

/// Errors raised while framing or unframing a group packet.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The sealed packet would exceed [`talus_types::limits::MAX_PACKET_SIZE`].
    #[error("payload too large: sealed packet would be {actual} bytes, max {max}")]
    PayloadTooLarge { actual: usize, max: usize },

    /// AEAD sealing failed (implementation bug — the cipher itself never
    /// rejects valid inputs).
    #[error("encryption failed")]
    EncryptFailed,

    /// The plaintext header's `chat_id_hash` does not match the expected
    /// group, or the outer type byte is not one of the three registered
    /// values.
    #[error("packet is not addressed to this chat")]
    BadChatId,

    /// AEAD authentication failed: wrong key, corrupted bytes, or a
    /// replayed/tampered packet.
    #[error("decryption failed")]
    DecryptFailed,

    /// The packet is shorter than the minimum frame size for its outer
    /// type, or the decrypted body is too short to contain its own
    /// `group_packet_type` byte.
    #[error("malformed packet: {0}")]
    Malformed(String),
}

/// Convenience result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
