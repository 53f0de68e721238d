//! Domain-separated BLAKE3 hashing for the Talus group-chat protocol.
//!
//! BLAKE3 covers every non-signature, non-AEAD hashing need in the core:
//! the peer-list checksum contribution, the moderator-list hash bound
//! into `SharedState`, the sanctions-list hash bound into
//! `SanctionsCredentials`, and session-key derivation after the X25519
//! handshake. Cross-purpose collisions are prevented by mandatory domain
//! separation using BLAKE3's built-in keyed-derivation mode.

/// Registered context strings. Using an unregistered context string
/// anywhere in the codebase is a protocol violation.
pub mod contexts {
    /// Session key derivation after an X25519 handshake.
    pub const SESSION_KEY: &str = "Talus v1 session-key";
    /// Moderator-list hash bound into `SharedState.mod_list_hash`.
    pub const MOD_LIST_HASH: &str = "Talus v1 mod-list-hash";
    /// Sanctions-entries hash bound into `SanctionsCredentials`.
    pub const SANCTIONS_HASH: &str = "Talus v1 sanctions-hash";
    /// Peer-list checksum rolling function seed.
    pub const PEER_LIST_CHECKSUM: &str = "Talus v1 peer-list-checksum";
    /// Chat-id hash used in the plaintext packet header.
    pub const CHAT_ID_HASH: &str = "Talus v1 chat-id-hash";

    /// All registered context strings, used for validation in tests.
    pub const ALL_CONTEXTS: &[&str] = &[
        SESSION_KEY,
        MOD_LIST_HASH,
        SANCTIONS_HASH,
        PEER_LIST_CHECKSUM,
        CHAT_ID_HASH,
    ];
}

/// Compute the BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key-derivation mode.
///
/// `context` must be one of the registered [`contexts`] strings.
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    out.copy_from_slice(hasher.finalize().as_bytes());
    out
}

/// Compute a keyed BLAKE3 hash (MAC/PRF mode).
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple dynamic-length fields as `LE32(len) || field`, repeated.
///
/// Used wherever a hash or signature must bind several variable-length
/// fields without ambiguity (e.g. sanctions-entry signing input).
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_context_strings_registered() {
        for ctx in contexts::ALL_CONTEXTS {
            assert!(is_registered_context(ctx));
            assert!(ctx.starts_with("Talus v1 "));
        }
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(b"talus test vector 1"), hash(b"talus test vector 1"));
    }

    #[test]
    fn test_hash_different_inputs() {
        assert_ne!(hash(b"input1"), hash(b"input2"));
    }

    #[test]
    fn test_derive_key_different_contexts() {
        let k1 = derive_key(contexts::SESSION_KEY, &[0u8; 32]);
        let k2 = derive_key(contexts::MOD_LIST_HASH, &[0u8; 32]);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_keyed_hash_deterministic() {
        let key = derive_key(contexts::SANCTIONS_HASH, b"");
        assert_eq!(keyed_hash(&key, b"abc"), keyed_hash(&key, b"abc"));
    }

    #[test]
    fn test_encode_multi_field_distinguishes_boundaries() {
        // "ab","c" must not collide with "a","bc"
        let a = encode_multi_field(&[b"ab", b"c"]);
        let b = encode_multi_field(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}
