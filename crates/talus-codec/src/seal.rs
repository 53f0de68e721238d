//! Sealing and opening the encrypted body of a group packet.
//!
//! The decrypted body layout is:
//!
//! ```text
//! group_packet_type:1 || (message_id:8 if outer_type == LOSSLESS) || payload || padding[0..8]
//! ```
//!
//! Padding is appended, not prefixed, and carries no explicit length
//! field: every payload format in this workspace is CBOR-encoded
//! (self-delimiting), so a decoder simply stops consuming bytes once it
//! has read one complete value and the trailing padding bytes are never
//! looked at. This is how "padding length encoded implicitly by packet
//! length" is realized without a wire field dedicated to it.

use rand::RngCore;
use talus_types::identity::{ChatId, EncPublicKey, SessionKey};
use talus_types::limits::{MAX_PACKET_SIZE, MAX_PADDING_LEN};

use crate::header::{chat_id_hash, OuterHeader, OuterType};
use crate::{CodecError, Result};

/// A decrypted, still-unparsed group packet body.
#[derive(Clone, Debug)]
pub struct DecodedPacket {
    pub group_packet_type: u8,
    pub message_id: Option<u64>,
    pub payload: Vec<u8>,
}

/// Seal a group packet for transmission.
///
/// `message_id` must be `Some` iff `outer_type` is [`OuterType::Lossless`];
/// passing the wrong combination is a caller bug and traps with
/// [`CodecError::Malformed`] rather than silently dropping the id.
pub fn seal(
    outer_type: OuterType,
    chat_id: &ChatId,
    sender_enc_pk: &EncPublicKey,
    session_key: &SessionKey,
    group_packet_type: u8,
    message_id: Option<u64>,
    payload: &[u8],
) -> Result<Vec<u8>> {
    if outer_type.carries_message_id() != message_id.is_some() {
        return Err(CodecError::Malformed(
            "message_id presence must match outer_type".to_string(),
        ));
    }

    let mut rng = rand::thread_rng();
    let mut nonce = [0u8; 24];
    rng.fill_bytes(&mut nonce);

    let header = OuterHeader {
        outer_type,
        chat_id_hash: chat_id_hash(chat_id),
        sender_enc_pk: *sender_enc_pk,
        nonce,
    };

    let padding_len = (rng.next_u32() as usize) % (MAX_PADDING_LEN + 1);
    let mut inner = Vec::with_capacity(1 + 8 + payload.len() + padding_len);
    inner.push(group_packet_type);
    if let Some(id) = message_id {
        inner.extend_from_slice(&id.to_be_bytes());
    }
    inner.extend_from_slice(payload);
    let mut padding = vec![0u8; padding_len];
    rng.fill_bytes(&mut padding);
    inner.extend_from_slice(&padding);

    let aad = header.to_bytes();
    let ciphertext = talus_crypto::chacha20::encrypt(session_key, &nonce, &inner, &aad)
        .map_err(|_| CodecError::EncryptFailed)?;

    let mut out = Vec::with_capacity(aad.len() + ciphertext.len());
    out.extend_from_slice(&aad);
    out.extend_from_slice(&ciphertext);

    if out.len() > MAX_PACKET_SIZE {
        return Err(CodecError::PayloadTooLarge {
            actual: out.len(),
            max: MAX_PACKET_SIZE,
        });
    }

    Ok(out)
}

/// Unframe and decrypt a group packet.
///
/// `expected_chat_id` is checked against the plaintext `chat_id_hash`
/// before any cryptographic work is attempted. `session_key` must be the
/// key already established with `sender_enc_pk` (the caller resolves
/// this via its peer table; `talus-codec` has no notion of a peer).
pub fn open(
    bytes: &[u8],
    expected_chat_id: &ChatId,
    session_key: &SessionKey,
) -> Result<(OuterHeader, DecodedPacket)> {
    let (header, ciphertext) = OuterHeader::parse(bytes)?;

    if header.chat_id_hash != chat_id_hash(expected_chat_id) {
        return Err(CodecError::BadChatId);
    }

    let aad = header.to_bytes();
    let plaintext = talus_crypto::chacha20::decrypt(session_key, &header.nonce, ciphertext, &aad)
        .map_err(|_| CodecError::DecryptFailed)?;

    if plaintext.is_empty() {
        return Err(CodecError::Malformed(
            "decrypted body is empty, missing group_packet_type".to_string(),
        ));
    }

    let group_packet_type = plaintext[0];
    let mut offset = 1;

    let message_id = if header.outer_type.carries_message_id() {
        if plaintext.len() < offset + 8 {
            return Err(CodecError::Malformed(
                "lossless packet missing message_id".to_string(),
            ));
        }
        let id = u64::from_be_bytes(plaintext[offset..offset + 8].try_into().map_err(|_| {
            CodecError::Malformed("message_id slice conversion failed".to_string())
        })?);
        offset += 8;
        Some(id)
    } else {
        None
    };

    let payload = plaintext[offset..].to_vec();

    Ok((
        header,
        DecodedPacket {
            group_packet_type,
            message_id,
            payload,
        },
    ))
}
