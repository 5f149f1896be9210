//! Authorization Policy
//!
//! Classifies users into roles from the statically configured owner and
//! admin ID sets and decides which operations each role may invoke.
//! Stateless: a pure function of configuration, recomputed per request.

use std::collections::HashSet;

use kg_common::{Role, UserId};

/// Role computation over the configured owner/admin sets.
///
/// The sets may overlap; owner membership takes precedence. There is no
/// runtime mutation path; changing either set requires a restart.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    owners: HashSet<UserId>,
    admins: HashSet<UserId>,
}

impl AuthorizationPolicy {
    /// Build a policy from the configured ID sets.
    #[must_use]
    pub fn new(owners: HashSet<UserId>, admins: HashSet<UserId>) -> Self {
        Self { owners, admins }
    }

    /// Classify a user. Owners are checked before admins, so a user in
    /// both sets is `Owner`.
    #[must_use]
    pub fn role_of(&self, user: UserId) -> Role {
        if self.owners.contains(&user) {
            Role::Owner
        } else if self.admins.contains(&user) {
            Role::Admin
        } else {
            Role::Regular
        }
    }

    /// Whether a role may register or remove code mappings.
    #[must_use]
    pub const fn can_mutate_store(role: Role) -> bool {
        matches!(role, Role::Owner | Role::Admin)
    }

    /// Number of configured privileged users, for startup logging.
    #[must_use]
    pub fn privileged_count(&self) -> usize {
        self.owners.union(&self.admins).count()
    }
}
