//! Role lookup against the profile store.
//!
//! The lookup never fails from the caller's point of view: it returns a
//! [`RoleLookup`] that says either which role was found or why none could
//! be. Turning a failure into [`Role::User`] is the manager's decision,
//! made in one place ([`RoleLookup::role`]).

use formula_identity::{ProfileStore, Role, UserId};

/// Outcome of resolving a user's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleLookup {
    /// The profile store answered. A missing row or a missing `role`
    /// column both resolve to [`Role::User`].
    Resolved(Role),

    /// The profile store couldn't be queried.
    Failed(String),
}

impl RoleLookup {
    /// The role to apply: the resolved one, or [`Role::User`] on failure.
    pub fn role(&self) -> Role {
        match self {
            Self::Resolved(role) => *role,
            Self::Failed(_) => Role::User,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Resolves the role for `user_id`.
///
/// An absent id short-circuits to `Resolved(Role::User)` without touching
/// the store.
pub async fn lookup_role<S: ProfileStore>(
    store: &S,
    user_id: Option<&UserId>,
) -> RoleLookup {
    let Some(user_id) = user_id else {
        return RoleLookup::Resolved(Role::User);
    };

    match store.fetch_profile(user_id).await {
        Ok(Some(profile)) => RoleLookup::Resolved(profile.role()),
        Ok(None) => {
            tracing::debug!(%user_id, "no profile row, defaulting to user role");
            RoleLookup::Resolved(Role::User)
        }
        Err(e) => RoleLookup::Failed(e.to_string()),
    }
}
