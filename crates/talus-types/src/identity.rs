//! Identity and key type aliases (§3 of the core spec).
//!
//! Talus fixes the cryptographic suite (Ed25519 signatures, X25519 key
//! agreement) so identity material is represented as raw 32-byte arrays
//! here; the `talus-crypto` crate is where those bytes are actually
//! signed, verified, or Diffie-Hellman'd.

/// An encryption public key (X25519), used only during the handshake.
pub type EncPublicKey = [u8; 32];

/// A signature public key (Ed25519), identifying a peer cryptographically
/// within a group for as long as they remain a member.
pub type SigPublicKey = [u8; 32];

/// The group's permanent identifier: its signature public key.
pub type ChatId = [u8; 32];

/// A per-pair, per-session symmetric AEAD key. Derived fresh on every
/// handshake and never persisted.
pub type SessionKey = [u8; 32];

/// A 24-byte AEAD nonce, drawn fresh per packet.
pub type PacketNonce = [u8; 24];

/// A 64-byte Ed25519 signature.
pub type SignatureBytes = [u8; 64];
