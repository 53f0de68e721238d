use serde::{Deserialize, Serialize};
use talus_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use talus_types::identity::{EncPublicKey, SigPublicKey};

use crate::{ModerationError, Result};

/// A signed demotion-to-observer record (§3, §4.5). `type` is fixed at 0
/// (observer) — the sanctions model has no other sanction kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SanctionsEntry {
    pub sanctioner_sig_pk: SigPublicKey,
    pub timestamp: u64,
    pub target_enc_pk: EncPublicKey,
    pub signature: [u8; 64],
}

impl SanctionsEntry {
    fn canonical_bytes(sanctioner_sig_pk: &SigPublicKey, timestamp: u64, target_enc_pk: &EncPublicKey) -> Vec<u8> {
        talus_crypto::blake3::encode_multi_field(&[
            &[0u8], // type = observer
            sanctioner_sig_pk,
            &timestamp.to_be_bytes(),
            target_enc_pk,
        ])
    }

    /// Sign a new entry. `sanctioner` must currently be the founder or a
    /// moderator — callers enforce this before calling, since the entry
    /// itself carries no proof of list membership beyond the signature.
    pub fn sign(
        sanctioner: &SigningKey,
        sanctioner_sig_pk: SigPublicKey,
        timestamp: u64,
        target_enc_pk: EncPublicKey,
    ) -> Self {
        let bytes = Self::canonical_bytes(&sanctioner_sig_pk, timestamp, &target_enc_pk);
        let signature = sanctioner.sign(&bytes).to_bytes();
        Self {
            sanctioner_sig_pk,
            timestamp,
            target_enc_pk,
            signature,
        }
    }

    /// Re-sign this entry under a new authoritative key, preserving the
    /// timestamp and target but replacing the sanctioner field and
    /// signature. Used for the founder-demotion invariant (§4.5).
    pub fn resign(&self, new_sanctioner: &SigningKey, new_sanctioner_sig_pk: SigPublicKey) -> Self {
        Self::sign(new_sanctioner, new_sanctioner_sig_pk, self.timestamp, self.target_enc_pk)
    }

    pub fn verify(&self) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.sanctioner_sig_pk).map_err(|_| ModerationError::BadSignature)?;
        let bytes = Self::canonical_bytes(&self.sanctioner_sig_pk, self.timestamp, &self.target_enc_pk);
        let sig = Signature::from_bytes(&self.signature);
        key.verify(&bytes, &sig).map_err(|_| ModerationError::BadSignature)
    }
}

/// `sign(modifier_sig_sk, version ‖ blake3(entries_sorted))` (§3, §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SanctionsCredentials {
    pub version: u32,
    pub modifier_sig_pk: SigPublicKey,
    pub signature: [u8; 64],
}

impl SanctionsCredentials {
    fn entries_hash(entries: &[SanctionsEntry]) -> [u8; 32] {
        let mut sorted: Vec<&SanctionsEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.signature.cmp(&b.signature));
        let mut buf = Vec::new();
        for entry in sorted {
            buf.extend_from_slice(&entry.sanctioner_sig_pk);
            buf.extend_from_slice(&entry.timestamp.to_be_bytes());
            buf.extend_from_slice(&entry.target_enc_pk);
            buf.extend_from_slice(&entry.signature);
        }
        talus_crypto::blake3::derive_key(talus_crypto::blake3::contexts::SANCTIONS_HASH, &buf)
    }

    fn canonical_bytes(version: u32, entries_hash: &[u8; 32]) -> Vec<u8> {
        talus_crypto::blake3::encode_multi_field(&[&version.to_be_bytes(), entries_hash])
    }

    pub fn sign(modifier: &SigningKey, modifier_sig_pk: SigPublicKey, version: u32, entries: &[SanctionsEntry]) -> Self {
        let hash = Self::entries_hash(entries);
        let bytes = Self::canonical_bytes(version, &hash);
        let signature = modifier.sign(&bytes).to_bytes();
        Self {
            version,
            modifier_sig_pk,
            signature,
        }
    }

    pub fn verify(&self, entries: &[SanctionsEntry]) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.modifier_sig_pk).map_err(|_| ModerationError::BadSignature)?;
        let hash = Self::entries_hash(entries);
        let bytes = Self::canonical_bytes(self.version, &hash);
        let sig = Signature::from_bytes(&self.signature);
        key.verify(&bytes, &sig).map_err(|_| ModerationError::BadSignature)
    }

    /// Tie-break when two credential updates carry the same version
    /// (concurrent moderators): resolved by lexicographic comparison of the
    /// modifier's signature bytes — the larger signature wins. The original
    /// tie-break behaviour is unspecified; this is this workspace's chosen
    /// deterministic convergence rule (see `S4` in the test suite for the
    /// analogous topic-version race, and DESIGN.md for the rationale).
    pub fn wins_tie_against(&self, other: &SanctionsCredentials) -> bool {
        debug_assert_eq!(self.version, other.version);
        self.signature > other.signature
    }
}

/// The set of sanctions entries plus the credentials authorizing the set
/// as a whole. Not persisted across restarts (§3): a founder or moderator
/// must re-derive it from re-broadcast or sync.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SanctionsList {
    pub entries: Vec<SanctionsEntry>,
    pub credentials: Option<SanctionsCredentials>,
}

impl SanctionsList {
    pub fn is_sanctioned(&self, target_enc_pk: &EncPublicKey) -> bool {
        self.entries.iter().any(|e| &e.target_enc_pk == target_enc_pk)
    }

    /// Accept a new (entries, credentials) pair if the credentials verify
    /// against the entries and either the version strictly increases, or it
    /// ties the current version and wins the lexicographic tie-break.
    pub fn accept(&mut self, entries: Vec<SanctionsEntry>, credentials: SanctionsCredentials) -> Result<bool> {
        for entry in &entries {
            entry.verify()?;
        }
        credentials.verify(&entries)?;

        let accept = match &self.credentials {
            None => true,
            Some(current) if credentials.version > current.version => true,
            Some(current) if credentials.version == current.version => credentials.wins_tie_against(current),
            _ => false,
        };

        if accept {
            self.entries = entries;
            self.credentials = Some(credentials);
        }
        Ok(accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanctions_entry_sign_verify_roundtrip() {
        let sanctioner = SigningKey::generate();
        let sig_pk = sanctioner.verifying_key().to_bytes();
        let entry = SanctionsEntry::sign(&sanctioner, sig_pk, 1000, [7u8; 32]);
        assert!(entry.verify().is_ok());
    }

    #[test]
    fn test_sanctions_entry_resign_changes_signer() {
        let mod_key = SigningKey::generate();
        let mod_pk = mod_key.verifying_key().to_bytes();
        let entry = SanctionsEntry::sign(&mod_key, mod_pk, 1000, [7u8; 32]);

        let founder_key = SigningKey::generate();
        let founder_pk = founder_key.verifying_key().to_bytes();
        let resigned = entry.resign(&founder_key, founder_pk);

        assert!(resigned.verify().is_ok());
        assert_eq!(resigned.sanctioner_sig_pk, founder_pk);
        assert_eq!(resigned.timestamp, entry.timestamp);
        assert_eq!(resigned.target_enc_pk, entry.target_enc_pk);
    }

    #[test]
    fn test_credentials_verify_roundtrip() {
        let modifier = SigningKey::generate();
        let pk = modifier.verifying_key().to_bytes();
        let entries = vec![SanctionsEntry::sign(&modifier, pk, 1, [1u8; 32])];
        let creds = SanctionsCredentials::sign(&modifier, pk, 1, &entries);
        assert!(creds.verify(&entries).is_ok());
    }

    #[test]
    fn test_sanctions_list_accepts_strictly_greater_version() {
        let modifier = SigningKey::generate();
        let pk = modifier.verifying_key().to_bytes();
        let mut list = SanctionsList::default();

        let entries_v1 = vec![SanctionsEntry::sign(&modifier, pk, 1, [1u8; 32])];
        let creds_v1 = SanctionsCredentials::sign(&modifier, pk, 1, &entries_v1);
        assert!(list.accept(entries_v1, creds_v1).expect("accept"));

        let entries_v1_dup = list.entries.clone();
        let creds_v1_dup = list.credentials.clone().expect("some");
        assert!(!list.accept(entries_v1_dup, creds_v1_dup).expect("accept"));
    }

    #[test]
    fn test_is_sanctioned() {
        let modifier = SigningKey::generate();
        let pk = modifier.verifying_key().to_bytes();
        let mut list = SanctionsList::default();
        let entries = vec![SanctionsEntry::sign(&modifier, pk, 1, [9u8; 32])];
        let creds = SanctionsCredentials::sign(&modifier, pk, 1, &entries);
        list.accept(entries, creds).expect("accept");
        assert!(list.is_sanctioned(&[9u8; 32]));
        assert!(!list.is_sanctioned(&[1u8; 32]));
    }
}
