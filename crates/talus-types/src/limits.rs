//! Wire-format size limits shared by every component crate (§4.1, §6).

/// Maximum group packet size, any outer type.
pub const MAX_PACKET_SIZE: usize = 1400;

/// Minimum lossless packet size (plaintext header + encrypted header +
/// message id, zero-length payload, zero padding).
pub const MIN_LOSSLESS_PACKET_SIZE: usize = 86;

/// Minimum lossy packet size (no message id).
pub const MIN_LOSSY_PACKET_SIZE: usize = 78;

/// Maximum random padding length appended before encryption.
pub const MAX_PADDING_LEN: usize = 8;

/// Maximum nickname length in bytes.
pub const MAX_NICK_LEN: usize = 128;

/// Maximum group name length in bytes (immutable, set at creation).
pub const MAX_NAME_LEN: usize = 48;

/// Maximum group password length in bytes.
pub const MAX_PASSWORD_LEN: usize = 32;

/// Maximum topic length in bytes.
pub const MAX_TOPIC_LEN: usize = 512;

/// Approximate confirmed-peer ping timeout, in seconds (§4.2).
pub const CONFIRMED_PEER_TIMEOUT_SECS: u64 = 72;
