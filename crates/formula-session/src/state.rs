//! The session state record every consumer reads.

use formula_identity::{Role, User, UserId};

/// A point-in-time copy of "who is logged in, and with what role".
///
/// The manager task owns the live state and publishes a fresh snapshot
/// after every change. Consumers only ever see snapshots, so they can't
/// mutate the state behind the manager's back.
///
/// Invariant: `user == None` implies `role == Role::User`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The signed-in identity, or `None` when logged out.
    pub user: Option<User>,

    /// The user's role. Never absent; falls back to [`Role::User`].
    pub role: Role,

    /// `true` exactly while an initialization, refresh, or login round
    /// trip is outstanding.
    pub loading: bool,

    /// `true` once the first session fetch has completed (successfully
    /// or not). Until then `user` and `role` are not final.
    pub initialized: bool,
}

impl SessionSnapshot {
    /// The state a manager starts in: nobody known yet, still loading.
    pub(crate) fn initial() -> Self {
        Self {
            user: None,
            role: Role::User,
            loading: true,
            initialized: false,
        }
    }

    /// `Some(user.id)` when signed in, `None` otherwise.
    pub fn current_user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot_is_loading_plain_user() {
        let snap = SessionSnapshot::initial();
        assert!(snap.loading);
        assert!(!snap.initialized);
        assert_eq!(snap.role, Role::User);
        assert!(snap.current_user_id().is_none());
        assert!(!snap.is_signed_in());
    }

    #[test]
    fn test_current_user_id_follows_user() {
        let snap = SessionSnapshot {
            user: Some(User::new("u1", "ada@example.com")),
            role: Role::Admin,
            loading: false,
            initialized: true,
        };
        assert_eq!(snap.current_user_id(), Some(&UserId::from("u1")));
        assert!(snap.is_admin());
    }
}
