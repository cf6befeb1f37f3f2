//! Error types for the identity layer.
//!
//! Every backend (hosted or in-memory) reports failures through this one
//! enum, so the session layer never has to know which backend it talks to.

/// Errors reported by an [`IdentityProvider`](crate::IdentityProvider) or
/// a [`ProfileStore`](crate::ProfileStore).
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the credentials (wrong password, unknown
    /// email, unconfirmed account...). Carries the provider's message.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The operation needs a signed-in session and there is none.
    #[error("no active session")]
    NotSignedIn,

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered, but the body wasn't what we expected.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl IdentityError {
    /// Returns `true` for failures caused by the caller's credentials
    /// rather than by the backend or the network.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_provider_message() {
        let err = IdentityError::AuthFailed("Invalid login credentials".into());
        assert_eq!(
            err.to_string(),
            "authentication failed: Invalid login credentials"
        );
    }

    #[test]
    fn test_api_display_includes_status() {
        let err = IdentityError::Api {
            status: 503,
            message: "upstream down".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(!err.is_auth_failure());
    }
}
