//! Thin CBOR wrapper for payloads this crate seals inside group packets.
//! Mirrors `talus-persist`'s `cbor` module; kept separate since this
//! crate's encode/decode targets are packet bodies, not save files.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode `value` to CBOR. Every type this crate serializes is a plain
/// derive-`Serialize` struct/enum over owned data, so encoding into an
/// in-memory `Vec<u8>` cannot fail.
pub(crate) fn cbor_to_vec<T: Serialize>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("encoding an engine payload cannot fail");
    buf
}

pub(crate) fn cbor_from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ciborium::de::Error<std::io::Error>> {
    ciborium::from_reader(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let value = (1u64, vec![1u8, 2, 3]);
        let bytes = cbor_to_vec(&value);
        let restored: (u64, Vec<u8>) = cbor_from_slice(&bytes).expect("decode");
        assert_eq!(restored, value);
    }
}
