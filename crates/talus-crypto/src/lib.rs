//! # talus-crypto
//!
//! Cryptographic primitives for the Talus group-chat core.
//!
//! The core protocol crates never inline a raw cryptographic operation;
//! everything goes through this crate, keeping the algorithm suite fixed
//! and auditable in one place. No algorithm negotiation is permitted.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing (checksums, hash binding)
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032) — the group
//!   signature key, moderator keys, and sanctions signatures.
//! - [`x25519`] — X25519 key agreement (RFC 7748) — the handshake and the
//!   per-pair session key.
//! - [`chacha20`] — ChaCha20-Poly1305 AEAD (RFC 8439) — packet sealing.

pub mod blake3;
pub mod chacha20;
pub mod ed25519;
pub mod x25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// AEAD encryption or decryption failed (authentication tag mismatch).
    #[error("AEAD operation failed")]
    AeadDecryption,

    /// A key or signature had the wrong length or was otherwise malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
