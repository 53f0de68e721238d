//! # talus-state
//!
//! The founder-signed, version-numbered group-wide configuration artifact
//! (§3, §4.4).

use serde::{Deserialize, Serialize};
use talus_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use talus_types::identity::{EncPublicKey, SigPublicKey};
use talus_types::limits::{MAX_NAME_LEN, MAX_PASSWORD_LEN};

/// Lossless group packet type carrying a `SharedState` update (§6).
pub const SHARED_STATE: u8 = 0xfb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    Public,
    Private,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("group name exceeds {MAX_NAME_LEN} bytes")]
    NameTooLong,
    #[error("password exceeds {MAX_PASSWORD_LEN} bytes")]
    PasswordTooLong,
    #[error("signature verification failed")]
    BadSignature,
    #[error("moderator list hash does not match SharedState.mod_list_hash")]
    HashMismatch,
    #[error("version {received} did not strictly increase past {current}")]
    VersionRegressed { received: u32, current: u32 },
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Founder-signed group-wide configuration (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedState {
    pub version: u32,
    pub founder_enc_pk: EncPublicKey,
    pub founder_sig_pk: SigPublicKey,
    pub peer_limit: u32,
    pub group_name: Vec<u8>,
    pub privacy: Privacy,
    pub password: Vec<u8>,
    pub topic_lock: bool,
    pub mod_list_hash: [u8; 32],
    pub signature: [u8; 64],
}

impl SharedState {
    fn canonical_bytes(
        version: u32,
        founder_enc_pk: &EncPublicKey,
        founder_sig_pk: &SigPublicKey,
        peer_limit: u32,
        group_name: &[u8],
        privacy: Privacy,
        password: &[u8],
        topic_lock: bool,
        mod_list_hash: &[u8; 32],
    ) -> Vec<u8> {
        talus_crypto::blake3::encode_multi_field(&[
            &version.to_be_bytes(),
            founder_enc_pk,
            founder_sig_pk,
            &peer_limit.to_be_bytes(),
            group_name,
            &[matches!(privacy, Privacy::Private) as u8],
            password,
            &[topic_lock as u8],
            mod_list_hash,
        ])
    }

    /// Founder-only: produce the next version, signed. Caller must send
    /// this before any accompanying `MOD_LIST` update so receivers can
    /// validate the new moderator list against the already-accepted hash
    /// (§4.4 invariant).
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        current: &SharedState,
        founder_signing_key: &SigningKey,
        peer_limit: u32,
        privacy: Privacy,
        password: Vec<u8>,
        topic_lock: bool,
        mod_list_hash: [u8; 32],
    ) -> Result<SharedState> {
        if password.len() > MAX_PASSWORD_LEN {
            return Err(StateError::PasswordTooLong);
        }

        let version = current.version + 1;
        let bytes = Self::canonical_bytes(
            version,
            &current.founder_enc_pk,
            &current.founder_sig_pk,
            peer_limit,
            &current.group_name,
            privacy,
            &password,
            topic_lock,
            &mod_list_hash,
        );
        let signature = founder_signing_key.sign(&bytes).to_bytes();

        Ok(SharedState {
            version,
            founder_enc_pk: current.founder_enc_pk,
            founder_sig_pk: current.founder_sig_pk,
            peer_limit,
            group_name: current.group_name.clone(),
            privacy,
            password,
            topic_lock,
            mod_list_hash,
            signature,
        })
    }

    /// The initial state produced at group creation.
    pub fn genesis(
        founder_signing_key: &SigningKey,
        founder_enc_pk: EncPublicKey,
        founder_sig_pk: SigPublicKey,
        group_name: Vec<u8>,
        privacy: Privacy,
        peer_limit: u32,
        mod_list_hash: [u8; 32],
    ) -> Result<SharedState> {
        if group_name.len() > MAX_NAME_LEN {
            return Err(StateError::NameTooLong);
        }
        let version = 1;
        let bytes = Self::canonical_bytes(
            version,
            &founder_enc_pk,
            &founder_sig_pk,
            peer_limit,
            &group_name,
            privacy,
            &[],
            false,
            &mod_list_hash,
        );
        let signature = founder_signing_key.sign(&bytes).to_bytes();
        Ok(SharedState {
            version,
            founder_enc_pk,
            founder_sig_pk,
            peer_limit,
            group_name,
            privacy,
            password: Vec::new(),
            topic_lock: false,
            mod_list_hash,
            signature,
        })
    }

    pub fn verify(&self) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.founder_sig_pk).map_err(|_| StateError::BadSignature)?;
        let bytes = Self::canonical_bytes(
            self.version,
            &self.founder_enc_pk,
            &self.founder_sig_pk,
            self.peer_limit,
            &self.group_name,
            self.privacy,
            &self.password,
            self.topic_lock,
            &self.mod_list_hash,
        );
        let sig = Signature::from_bytes(&self.signature);
        key.verify(&bytes, &sig).map_err(|_| StateError::BadSignature)
    }

    /// `receive(packet)`: verify signature against the Chat ID; if
    /// `version <= current.version` drop silently (testable property 8);
    /// else replace current (§4.4). Returns `true` if accepted.
    pub fn receive(current: &mut SharedState, incoming: SharedState) -> Result<bool> {
        if incoming.version <= current.version {
            return Ok(false);
        }
        incoming.verify()?;
        *current = incoming;
        Ok(true)
    }

    /// Testable property 1: the accepted mod-list hash matches.
    pub fn check_mod_list_hash(&self, computed: &[u8; 32]) -> Result<()> {
        if &self.mod_list_hash != computed {
            return Err(StateError::HashMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> (SigningKey, SharedState) {
        let founder = SigningKey::generate();
        let sig_pk = founder.verifying_key().to_bytes();
        let state = SharedState::genesis(&founder, [1u8; 32], sig_pk, b"Utah Data Center".to_vec(), Privacy::Private, 32, [0u8; 32])
            .expect("genesis");
        (founder, state)
    }

    #[test]
    fn test_genesis_verifies() {
        let (_, state) = genesis();
        assert!(state.verify().is_ok());
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_update_increments_version_and_verifies() {
        let (founder, state) = genesis();
        let updated = SharedState::update(&state, &founder, 16, Privacy::Public, vec![], true, [0u8; 32]).expect("update");
        assert_eq!(updated.version, 2);
        assert!(updated.verify().is_ok());
    }

    #[test]
    fn test_receive_drops_non_increasing_version() {
        let (founder, state) = genesis();
        let mut current = SharedState::update(&state, &founder, 16, Privacy::Public, vec![], true, [0u8; 32]).expect("update");
        let stale = state;
        assert!(!SharedState::receive(&mut current, stale).expect("receive"));
        assert_eq!(current.version, 2);
    }

    #[test]
    fn test_receive_rejects_bad_signature() {
        let (founder, state) = genesis();
        let mut current = state.clone();
        let mut tampered = SharedState::update(&state, &founder, 16, Privacy::Public, vec![], true, [0u8; 32]).expect("update");
        tampered.peer_limit = 999;
        assert!(SharedState::receive(&mut current, tampered).is_err());
    }

    #[test]
    fn test_password_too_long_rejected() {
        let (founder, state) = genesis();
        let err = SharedState::update(&state, &founder, 16, Privacy::Public, vec![0u8; 64], true, [0u8; 32]).unwrap_err();
        assert!(matches!(err, StateError::PasswordTooLong));
    }
}
