//! Contracts for the external services the session layer depends on.
//!
//! Formula doesn't run its own identity service. It talks to a hosted
//! one (Supabase in production) through two small traits:
//!
//! - [`IdentityProvider`]: sessions, password sign-in, sign-out, and a
//!   stream of change notifications.
//! - [`ProfileStore`]: the `profiles` table that maps a user id to a role.
//!
//! Keeping these as traits means the session manager can run against the
//! HTTP backend in production, the [`MemoryBackend`](crate::MemoryBackend)
//! in tests and offline demos, or a purpose-built mock, with no changes.

use std::future::Future;

use tokio::sync::broadcast;

use crate::{AuthChange, Credentials, IdentityError, Profile, Session, UserId};

/// Receiving half of a provider's change stream.
pub type AuthChanges = broadcast::Receiver<AuthChange>;

/// A hosted identity service.
///
/// # Trait bounds
///
/// - `Send + Sync` → one provider is shared by the manager task and by
///   whoever else holds a clone.
/// - `'static` → the provider outlives any single request; the manager
///   task keeps it for its whole lifetime.
///
/// # Example
///
/// ```rust
/// use formula_identity::{
///     AuthChanges, Credentials, IdentityError, IdentityProvider, Session,
/// };
/// use tokio::sync::broadcast;
///
/// /// A provider where nobody is ever signed in.
/// struct Anonymous {
///     events: broadcast::Sender<formula_identity::AuthChange>,
/// }
///
/// impl IdentityProvider for Anonymous {
///     async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
///         Ok(None)
///     }
///
///     fn subscribe(&self) -> AuthChanges {
///         self.events.subscribe()
///     }
///
///     async fn sign_in_with_password(
///         &self,
///         _credentials: &Credentials,
///     ) -> Result<Session, IdentityError> {
///         Err(IdentityError::AuthFailed("sign-in disabled".into()))
///     }
///
///     async fn sign_out(&self) -> Result<(), IdentityError> {
///         Ok(())
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the session the provider currently holds, if any.
    ///
    /// `Ok(None)` means "nobody is signed in"; `Err` means the provider
    /// couldn't answer at all.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, IdentityError>> + Send;

    /// Opens a standing subscription to sign-in / sign-out / refresh
    /// notifications. Every change made through this provider (including
    /// by someone else holding a clone of it) shows up here.
    fn subscribe(&self) -> AuthChanges;

    /// Signs in with email and password.
    ///
    /// # Returns
    /// - `Ok(Session)`: the new session (also announced as `SignedIn`)
    /// - `Err(IdentityError::AuthFailed)`: credentials rejected
    /// - any other `Err`: backend or network failure
    fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, IdentityError>> + Send;

    /// Ends the current session (announced as `SignedOut`).
    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

/// Read access to the `profiles` table.
pub trait ProfileStore: Send + Sync + 'static {
    /// Looks up the profile row for `user_id`.
    ///
    /// `Ok(None)` means there is no such row.
    fn fetch_profile(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<Profile>, IdentityError>> + Send;
}
