//! The plaintext, unencrypted outer header (§4.1).

use talus_types::identity::{ChatId, EncPublicKey, PacketNonce};

use crate::{CodecError, Result};

/// `outer_type` byte values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OuterType {
    Handshake,
    Lossless,
    Lossy,
}

impl OuterType {
    /// Wire byte value.
    pub fn to_byte(self) -> u8 {
        match self {
            OuterType::Handshake => 0x5a,
            OuterType::Lossless => 0x5b,
            OuterType::Lossy => 0x5c,
        }
    }

    /// Decode the wire byte, rejecting anything not in the registry.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x5a => Ok(OuterType::Handshake),
            0x5b => Ok(OuterType::Lossless),
            0x5c => Ok(OuterType::Lossy),
            other => Err(CodecError::Malformed(format!(
                "unknown outer packet type 0x{other:02x}"
            ))),
        }
    }

    /// Whether packets of this type carry an 8-byte `message_id` in the
    /// encrypted header.
    pub fn carries_message_id(self) -> bool {
        matches!(self, OuterType::Lossless)
    }
}

/// Length of the plaintext header in bytes: `1 + 4 + 32 + 24`.
pub const PLAINTEXT_HEADER_LEN: usize = 1 + 4 + 32 + 24;

/// The unencrypted prefix of every group packet.
#[derive(Clone, Debug)]
pub struct OuterHeader {
    pub outer_type: OuterType,
    pub chat_id_hash: u32,
    pub sender_enc_pk: EncPublicKey,
    pub nonce: PacketNonce,
}

impl OuterHeader {
    /// Serialize the plaintext header to its fixed-size wire form.
    pub fn to_bytes(&self) -> [u8; PLAINTEXT_HEADER_LEN] {
        let mut out = [0u8; PLAINTEXT_HEADER_LEN];
        out[0] = self.outer_type.to_byte();
        out[1..5].copy_from_slice(&self.chat_id_hash.to_be_bytes());
        out[5..37].copy_from_slice(&self.sender_enc_pk);
        out[37..61].copy_from_slice(&self.nonce);
        out
    }

    /// Parse the plaintext header from the front of `bytes`, returning it
    /// along with the remaining (still-sealed) tail.
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < PLAINTEXT_HEADER_LEN {
            return Err(CodecError::Malformed(format!(
                "packet shorter than plaintext header: {} < {PLAINTEXT_HEADER_LEN}",
                bytes.len()
            )));
        }

        let outer_type = OuterType::from_byte(bytes[0])?;
        let chat_id_hash = u32::from_be_bytes(bytes[1..5].try_into().map_err(|_| {
            CodecError::Malformed("chat_id_hash slice conversion failed".to_string())
        })?);

        let mut sender_enc_pk = [0u8; 32];
        sender_enc_pk.copy_from_slice(&bytes[5..37]);

        let mut nonce = [0u8; 24];
        nonce.copy_from_slice(&bytes[37..61]);

        let header = OuterHeader {
            outer_type,
            chat_id_hash,
            sender_enc_pk,
            nonce,
        };
        Ok((header, &bytes[PLAINTEXT_HEADER_LEN..]))
    }
}

/// Deterministic 32-bit hash of a Chat ID, used to cheaply drop packets
/// not addressed to this group before any cryptographic work.
pub fn chat_id_hash(chat_id: &ChatId) -> u32 {
    let full = talus_crypto::blake3::derive_key(talus_crypto::blake3::contexts::CHAT_ID_HASH, chat_id);
    u32::from_be_bytes([full[0], full[1], full[2], full[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_type_roundtrip() {
        for t in [OuterType::Handshake, OuterType::Lossless, OuterType::Lossy] {
            assert_eq!(OuterType::from_byte(t.to_byte()).expect("valid"), t);
        }
    }

    #[test]
    fn test_unknown_outer_type_rejected() {
        assert!(OuterType::from_byte(0x00).is_err());
    }

    #[test]
    fn test_header_roundtrip() {
        let header = OuterHeader {
            outer_type: OuterType::Lossless,
            chat_id_hash: 0xdeadbeef,
            sender_enc_pk: [7u8; 32],
            nonce: [9u8; 24],
        };
        let bytes = header.to_bytes();
        let (parsed, rest) = OuterHeader::parse(&bytes).expect("parse");
        assert_eq!(parsed.outer_type, OuterType::Lossless);
        assert_eq!(parsed.chat_id_hash, 0xdeadbeef);
        assert_eq!(parsed.sender_enc_pk, [7u8; 32]);
        assert_eq!(parsed.nonce, [9u8; 24]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!(OuterHeader::parse(&[0x5b; 10]).is_err());
    }

    #[test]
    fn test_chat_id_hash_deterministic() {
        let chat_id = [3u8; 32];
        assert_eq!(chat_id_hash(&chat_id), chat_id_hash(&chat_id));
    }

    #[test]
    fn test_chat_id_hash_differs_across_ids() {
        assert_ne!(chat_id_hash(&[1u8; 32]), chat_id_hash(&[2u8; 32]));
    }
}
