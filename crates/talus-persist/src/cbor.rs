//! CBOR (de)serialization helpers shared by the saved-group record.
//!
//! CBOR is the ambient wire format this workspace already uses for
//! packet payloads (`talus-codec`); the saved record reuses it rather
//! than inventing a bespoke binary layout.

use serde::{de::DeserializeOwned, Serialize};

use crate::PersistError;

pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, PersistError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PersistError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, PersistError> {
    ciborium::from_reader(data).map_err(|e| PersistError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        a: u32,
        b: Vec<u8>,
    }

    #[test]
    fn test_roundtrip() {
        let sample = Sample { a: 7, b: vec![1, 2, 3] };
        let bytes = to_vec(&sample).expect("encode");
        let restored: Sample = from_slice(&bytes).expect("decode");
        assert_eq!(sample, restored);
    }

    #[test]
    fn test_bad_bytes_rejected() {
        let result: Result<Sample, _> = from_slice(&[0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }
}
