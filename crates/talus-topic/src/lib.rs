//! # talus-topic
//!
//! Versioned, signed group topic with re-sign on moderator demotion (§4.6).

use serde::{Deserialize, Serialize};
use talus_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use talus_types::identity::SigPublicKey;
use talus_types::limits::MAX_TOPIC_LEN;
use talus_types::role::Role;

/// Lossless group packet type: `{ sig:64, version:4, len:2, bytes, setter_sig_pk:32 }` (§6).
pub const TOPIC: u8 = 0xfa;

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic exceeds {MAX_TOPIC_LEN} bytes")]
    TooLong,
    #[error("caller's role does not permit setting the topic under the current lock policy")]
    PermissionDenied,
    #[error("signature verification failed")]
    BadSignature,
    #[error("version {received} did not strictly increase past {current}")]
    VersionRegressed { received: u32, current: u32 },
    #[error("signer is not currently authorized under the current lock policy")]
    UnauthorizedSigner,
}

pub type Result<T> = std::result::Result<T, TopicError>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopicInfo {
    pub version: u32,
    pub topic: Vec<u8>,
    pub setter_sig_pk: SigPublicKey,
    pub signature: [u8; 64],
}

impl TopicInfo {
    fn canonical_bytes(version: u32, topic: &[u8], setter_sig_pk: &SigPublicKey) -> Vec<u8> {
        talus_crypto::blake3::encode_multi_field(&[&version.to_be_bytes(), topic, setter_sig_pk])
    }

    /// `set(topic_bytes)`: permitted iff (topic-lock enabled and caller is
    /// Founder or Moderator) or (topic-lock disabled and caller outranks
    /// Observer) (§4.6).
    pub fn set(
        current: Option<&TopicInfo>,
        caller_role: Role,
        topic_lock: bool,
        setter_signing_key: &SigningKey,
        setter_sig_pk: SigPublicKey,
        topic: Vec<u8>,
    ) -> Result<TopicInfo> {
        if topic.len() > MAX_TOPIC_LEN {
            return Err(TopicError::TooLong);
        }

        let permitted = if topic_lock {
            caller_role >= Role::Moderator
        } else {
            caller_role > Role::Observer
        };
        if !permitted {
            return Err(TopicError::PermissionDenied);
        }

        let version = current.map_or(1, |c| c.version + 1);
        let bytes = Self::canonical_bytes(version, &topic, &setter_sig_pk);
        let signature = setter_signing_key.sign(&bytes).to_bytes();

        Ok(TopicInfo {
            version,
            topic,
            setter_sig_pk,
            signature,
        })
    }

    fn verify(&self) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.setter_sig_pk).map_err(|_| TopicError::BadSignature)?;
        let bytes = Self::canonical_bytes(self.version, &self.topic, &self.setter_sig_pk);
        let sig = Signature::from_bytes(&self.signature);
        key.verify(&bytes, &sig).map_err(|_| TopicError::BadSignature)
    }

    /// Receiver verification (§4.6): the signer is currently founder or in
    /// the moderator list (lock on) or not an observer (lock off);
    /// signature verifies; version strictly increases, or ties against the
    /// current version and wins the lexicographic signature-bytes
    /// tie-break (two moderators racing to the same version from the same
    /// base). `signer_role` must be resolved against the *current*
    /// moderation state at delivery time, which also satisfies the
    /// re-validation-on-lock-toggle policy for queued, not-yet-delivered
    /// updates.
    pub fn receive(
        current: Option<&TopicInfo>,
        incoming: &TopicInfo,
        signer_role: Role,
        topic_lock: bool,
    ) -> Result<()> {
        let authorized = if topic_lock {
            signer_role >= Role::Moderator
        } else {
            signer_role > Role::Observer
        };
        if !authorized {
            return Err(TopicError::UnauthorizedSigner);
        }

        incoming.verify()?;

        if let Some(current) = current {
            let accepted = match incoming.version.cmp(&current.version) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Equal => incoming.wins_tie_against(current),
                std::cmp::Ordering::Less => false,
            };
            if !accepted {
                return Err(TopicError::VersionRegressed {
                    received: incoming.version,
                    current: current.version,
                });
            }
        }

        Ok(())
    }

    /// Lexicographic signature-bytes tie-break for two topics racing to
    /// the same version (§4.6, §8 S4): the larger signature wins,
    /// matching the sanctions-credentials tie-break.
    pub fn wins_tie_against(&self, other: &TopicInfo) -> bool {
        debug_assert_eq!(self.version, other.version);
        self.signature > other.signature
    }

    /// Founder-demotion invariant for the topic (§4.5): if the current
    /// topic-setter is demoted, the founder re-signs the topic under its
    /// own key without changing the version, preserving "signed by a
    /// currently authoritative key."
    pub fn resign_by_founder(&self, founder_signing_key: &SigningKey, founder_sig_pk: SigPublicKey) -> TopicInfo {
        let bytes = Self::canonical_bytes(self.version, &self.topic, &founder_sig_pk);
        let signature = founder_signing_key.sign(&bytes).to_bytes();
        TopicInfo {
            version: self.version,
            topic: self.topic.clone(),
            setter_sig_pk: founder_sig_pk,
            signature,
        }
    }
}
