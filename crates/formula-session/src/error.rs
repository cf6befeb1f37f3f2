//! Error types for the session layer.

use formula_identity::IdentityError;

/// Errors returned by [`SessionHandle`](crate::SessionHandle) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity provider refused or failed the request. For `login`
    /// this is how bad credentials come back.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The session manager task has stopped (shut down, or every handle
    /// to it was dropped).
    #[error("session manager is unavailable")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_identity_error_is_transparent() {
        let err: SessionError =
            IdentityError::AuthFailed("Invalid login credentials".into()).into();
        assert!(matches!(err, SessionError::Identity(_)));
        assert_eq!(
            err.to_string(),
            "authentication failed: Invalid login credentials"
        );
    }
}
