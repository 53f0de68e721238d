use serde::{Deserialize, Serialize};
use talus_types::identity::SigPublicKey;
use talus_types::role::Role;

use crate::sanctions::{SanctionsEntry, SanctionsList};
use crate::{ModerationError, Result};

/// Ordered sequence of moderator signature keys (§3). Persisted; hash must
/// match `SharedState.mod_list_hash`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModeratorList {
    pub members: Vec<SigPublicKey>,
}

impl ModeratorList {
    pub fn contains(&self, sig_pk: &SigPublicKey) -> bool {
        self.members.iter().any(|m| m == sig_pk)
    }

    pub fn add(&mut self, sig_pk: SigPublicKey) {
        if !self.contains(&sig_pk) {
            self.members.push(sig_pk);
        }
    }

    pub fn remove(&mut self, sig_pk: &SigPublicKey) {
        self.members.retain(|m| m != sig_pk);
    }

    /// Domain-separated hash bound into `SharedState.mod_list_hash` (§3).
    pub fn hash(&self) -> [u8; 32] {
        let mut fields: Vec<&[u8]> = Vec::with_capacity(self.members.len());
        for m in &self.members {
            fields.push(m);
        }
        let encoded = talus_crypto::blake3::encode_multi_field(&fields);
        talus_crypto::blake3::derive_key(talus_crypto::blake3::contexts::MOD_LIST_HASH, &encoded)
    }
}

/// Result of a successful [`ModerationState::set_role`] call: what must be
/// broadcast and, for a demotion to Observer, the new sanctions entry and
/// updated credentials to accompany it.
pub enum SetRoleOutcome {
    Promoted {
        new_moderator_list: ModeratorList,
    },
    DemotedFromModerator {
        new_moderator_list: ModeratorList,
    },
    /// The caller must still sign a [`SanctionsEntry`] for the target
    /// (`ModerationState` holds no secret keys) and feed it back through
    /// [`ModerationState::sanctions`]'s `accept`.
    DemotedToObserver,
    /// `new_role` already matched the target's current standing (e.g. a
    /// plain `User` target set to `User`) — nothing to broadcast. Removal
    /// from the group is a distinct operation (`GroupEngine::kick`), never
    /// reached through `set_role`.
    NoChange,
}

/// Enforces the role lattice (`Founder > Moderator > User > Observer`) and
/// owns the moderator list and sanctions list together, since a role
/// transition to or from Moderator touches both (§4.5).
pub struct ModerationState {
    pub founder_sig_pk: SigPublicKey,
    pub moderator_list: ModeratorList,
    pub sanctions: SanctionsList,
}

impl ModerationState {
    pub fn new(founder_sig_pk: SigPublicKey) -> Self {
        Self {
            founder_sig_pk,
            moderator_list: ModeratorList::default(),
            sanctions: SanctionsList::default(),
        }
    }

    pub fn role_of(&self, sig_pk: &SigPublicKey) -> Role {
        if *sig_pk == self.founder_sig_pk {
            Role::Founder
        } else if self.moderator_list.contains(sig_pk) {
            Role::Moderator
        } else {
            Role::User
        }
    }

    /// A sanctioner is authorized only while currently founder or a
    /// moderator (§4.5, testable property 2).
    pub fn is_authorized_sanctioner(&self, sig_pk: &SigPublicKey) -> bool {
        *sig_pk == self.founder_sig_pk || self.moderator_list.contains(sig_pk)
    }

    /// Gate for an inbound `(entries, credentials)` pair (§4.5, testable
    /// property 2): every entry's signer must be currently authorized
    /// against *this* peer's moderator list before the signatures and
    /// version are even considered, so a demoted signer's replayed or
    /// forged update can never win a version race against a legitimately
    /// re-signed one.
    pub fn accept_sanctions(
        &mut self,
        entries: Vec<SanctionsEntry>,
        credentials: SanctionsCredentials,
    ) -> Result<bool> {
        if !entries.iter().all(|e| self.is_authorized_sanctioner(&e.sanctioner_sig_pk)) {
            return Err(ModerationError::UnauthorizedSanctioner);
        }
        self.sanctions.accept(entries, credentials)
    }

    /// `set_role(target, new_role)`: permitted only if the caller's role
    /// outranks the target's current role, the caller's role is at least
    /// `new_role`, and `new_role` is never `Founder` (§4.5).
    pub fn set_role(
        &mut self,
        caller_sig_pk: &SigPublicKey,
        target_sig_pk: &SigPublicKey,
        new_role: Role,
    ) -> Result<SetRoleOutcome> {
        if caller_sig_pk == target_sig_pk {
            return Err(ModerationError::TargetIsSelf);
        }
        if new_role == Role::Founder {
            return Err(ModerationError::InvalidRole);
        }

        let caller_role = self.role_of(caller_sig_pk);
        let target_role = self.role_of(target_sig_pk);

        if !caller_role.outranks(target_role) || caller_role < new_role {
            return Err(ModerationError::PermissionDenied);
        }

        let was_moderator = self.moderator_list.contains(target_sig_pk);

        match new_role {
            Role::Moderator => {
                self.moderator_list.add(*target_sig_pk);
                Ok(SetRoleOutcome::Promoted {
                    new_moderator_list: self.moderator_list.clone(),
                })
            }
            Role::User => {
                if was_moderator {
                    self.moderator_list.remove(target_sig_pk);
                    Ok(SetRoleOutcome::DemotedFromModerator {
                        new_moderator_list: self.moderator_list.clone(),
                    })
                } else {
                    Ok(SetRoleOutcome::NoChange)
                }
            }
            Role::Observer => {
                if was_moderator {
                    self.moderator_list.remove(target_sig_pk);
                }
                Ok(SetRoleOutcome::DemotedToObserver)
            }
            Role::Founder => unreachable!("checked above"),
        }
    }

    /// Founder-demotion invariant (§4.5): when a moderator is removed, every
    /// sanctions entry they previously signed must be re-signed by the
    /// founder and re-broadcast so the chain of authority stays valid.
    pub fn resign_entries_after_demotion(
        &self,
        demoted_sig_pk: &SigPublicKey,
        founder_signing_key: &talus_crypto::ed25519::SigningKey,
    ) -> Vec<SanctionsEntry> {
        self.sanctions
            .entries
            .iter()
            .filter(|e| &e.sanctioner_sig_pk == demoted_sig_pk)
            .map(|e| e.resign(founder_signing_key, self.founder_sig_pk))
            .collect()
    }
}
