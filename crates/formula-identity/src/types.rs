//! Identity types shared by every layer of Formula.
//!
//! These mirror the JSON the hosted identity provider hands out (GoTrue
//! users and sessions) closely enough that they can be deserialized
//! directly, while giving the rest of the workspace strongly-typed ids
//! and a closed [`Role`] enum instead of loose strings.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The provider's identifier for a user (a UUID string on Supabase).
///
/// Newtype wrapper so a user id can't be confused with an email, a slug,
/// or an access token even though all of them are strings underneath.
/// `#[serde(transparent)]` keeps it a bare string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An authenticated identity as reported by the provider.
///
/// Only `id` is guaranteed. Everything else the provider sends is kept in
/// `user_metadata` / `app_metadata` as raw JSON so views can read fields
/// this crate doesn't know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub last_sign_in_at: Option<String>,

    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Builds a user with just an id and email. Handy for in-memory
    /// backends and tests.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            email: Some(email.into()),
            created_at: None,
            last_sign_in_at: None,
            user_metadata: serde_json::Map::new(),
            app_metadata: serde_json::Map::new(),
        }
    }
}

/// A provider-issued session: proof that `user` is currently signed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: u64,

    /// Unix timestamp (seconds) at which `access_token` expires.
    #[serde(default)]
    pub expires_at: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Email + password pair for password sign-in.
///
/// `Debug` is implemented by hand so the password never lands in logs.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Roles and profiles
// ---------------------------------------------------------------------------

/// Coarse authorization label attached to a profile.
///
/// There is deliberately no "none" variant: a user without a resolved
/// role, and a visitor with no session at all, are both `User`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Maps a raw profile `role` column to a [`Role`].
    ///
    /// Only the exact string `"admin"` grants [`Role::Admin`]; anything
    /// else, including a missing value, is a plain user.
    pub fn from_profile(raw: Option<&str>) -> Self {
        match raw {
            Some("admin") => Self::Admin,
            Some("user") | None => Self::User,
            Some(other) => {
                tracing::debug!(role = other, "unknown profile role, treating as user");
                Self::User
            }
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A row of the `profiles` table, as far as this workspace cares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub role: Option<String>,
}

impl Profile {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
        }
    }

    /// The profile's role, collapsed to the fixed [`Role`] set.
    pub fn role(&self) -> Role {
        Role::from_profile(self.role.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Auth change notifications
// ---------------------------------------------------------------------------

/// What kind of transition the provider observed.
///
/// Names follow the provider's own event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
        };
        f.write_str(name)
    }
}

/// One message on the provider's change stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    /// The user carried by this change, if any. `None` means "logged out".
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}
