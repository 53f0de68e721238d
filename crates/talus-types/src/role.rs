use serde::{Deserialize, Serialize};

/// The role lattice: `Founder > Moderator > User > Observer` (§4.5).
///
/// Declared lowest-to-highest so the derived [`Ord`] implementation is
/// exactly the privilege ordering the spec describes — every higher
/// role has all the privileges of every lower one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Demoted: may read but not write messages.
    Observer,
    /// Default role for a confirmed peer.
    User,
    /// May set roles below themselves, sanction users, and set the topic
    /// regardless of topic-lock.
    Moderator,
    /// The group's creator. Exactly one per group, for the group's
    /// lifetime; never assignable via `set_role`.
    Founder,
}

impl Role {
    /// Whether this role may perform `set_role`/`kick` against `target`
    /// at all, irrespective of the requested new role (§4.5: "caller's
    /// role > target's role").
    pub fn outranks(self, target: Role) -> bool {
        self > target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_order() {
        assert!(Role::Founder > Role::Moderator);
        assert!(Role::Moderator > Role::User);
        assert!(Role::User > Role::Observer);
    }

    #[test]
    fn test_outranks() {
        assert!(Role::Founder.outranks(Role::Moderator));
        assert!(!Role::User.outranks(Role::Moderator));
        assert!(!Role::User.outranks(Role::User));
    }
}
