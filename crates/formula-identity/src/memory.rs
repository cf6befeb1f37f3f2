//! An in-memory identity backend.
//!
//! [`MemoryBackend`] implements both [`IdentityProvider`] and
//! [`ProfileStore`] without any network. It behaves like a hosted
//! provider from the outside: it issues random access tokens, keeps one
//! current session, and announces every transition on its change stream.
//!
//! It also exposes the knobs tests need: simulating a token refresh or a
//! server-side sign-out, making session or profile queries fail, and
//! counting how many profile lookups were made.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::Rng;
use tokio::sync::{Mutex, broadcast};

use crate::{
    AuthChange, AuthChanges, AuthEvent, Credentials, IdentityError,
    IdentityProvider, Profile, ProfileStore, Session, User, UserId,
};

/// How many change notifications a slow subscriber may fall behind
/// before it starts missing them.
const EVENT_BUFFER: usize = 32;

/// Lifetime advertised for issued access tokens.
const TOKEN_LIFETIME_SECS: u64 = 3600;

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct Store {
    /// Registered accounts, keyed by email.
    accounts: HashMap<String, Account>,
    profiles: HashMap<UserId, Profile>,
    session: Option<Session>,
}

struct Inner {
    store: Mutex<Store>,
    events: broadcast::Sender<AuthChange>,
    fail_sessions: AtomicBool,
    fail_profiles: AtomicBool,
    profile_lookups: AtomicUsize,
}

/// In-memory identity provider and profile store.
///
/// Cheap to clone; clones share the same accounts, session, and change
/// stream, the same way every handle on a hosted client shares one
/// session.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    /// Creates an empty backend: no accounts, no profiles, no session.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::default()),
                events,
                fail_sessions: AtomicBool::new(false),
                fail_profiles: AtomicBool::new(false),
                profile_lookups: AtomicUsize::new(0),
            }),
        }
    }

    /// Registers an account that can sign in with `email` / `password`.
    pub async fn add_account(&self, user: User, password: impl Into<String>) {
        let email = user.email.clone().unwrap_or_else(|| user.id.to_string());
        let mut store = self.inner.store.lock().await;
        store.accounts.insert(
            email,
            Account {
                password: password.into(),
                user,
            },
        );
    }

    /// Inserts or replaces the profile row for `user_id`.
    pub async fn set_profile(&self, user_id: UserId, profile: Profile) {
        self.inner.store.lock().await.profiles.insert(user_id, profile);
    }

    /// Deletes the profile row for `user_id`.
    pub async fn remove_profile(&self, user_id: &UserId) {
        self.inner.store.lock().await.profiles.remove(user_id);
    }

    /// Installs a session for `user` without checking credentials and
    /// announces it as `SignedIn`, as if another tab had just logged in.
    pub async fn sign_in_as(&self, user: User) -> Session {
        let session = issue_session(user);
        self.inner.store.lock().await.session = Some(session.clone());
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        session
    }

    /// Rotates the current session's tokens and announces
    /// `TokenRefreshed`. Returns the new session, or `None` if nobody is
    /// signed in.
    pub async fn refresh_session(&self) -> Option<Session> {
        let session = {
            let mut store = self.inner.store.lock().await;
            let current = store.session.as_ref()?;
            let refreshed = issue_session(current.user.clone());
            store.session = Some(refreshed.clone());
            refreshed
        };
        self.emit(AuthEvent::TokenRefreshed, Some(session.clone()));
        Some(session)
    }

    /// Drops the current session and announces `SignedOut`, as if it had
    /// been revoked on the server.
    pub async fn revoke_session(&self) {
        self.inner.store.lock().await.session = None;
        self.emit(AuthEvent::SignedOut, None);
    }

    /// Pushes an arbitrary change notification to every subscriber.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        // No subscribers is fine: nobody is listening yet.
        let _ = self.inner.events.send(AuthChange { event, session });
    }

    /// Makes `get_session` fail with a transport error while `true`.
    pub fn fail_session_fetch(&self, fail: bool) {
        self.inner.fail_sessions.store(fail, Ordering::SeqCst);
    }

    /// Makes `fetch_profile` fail with a transport error while `true`.
    pub fn fail_profile_fetch(&self, fail: bool) {
        self.inner.fail_profiles.store(fail, Ordering::SeqCst);
    }

    /// Number of `fetch_profile` calls made so far (failed ones included).
    pub fn profile_lookups(&self) -> usize {
        self.inner.profile_lookups.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        if self.inner.fail_sessions.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("session store offline".into()));
        }
        Ok(self.inner.store.lock().await.session.clone())
    }

    fn subscribe(&self) -> AuthChanges {
        self.inner.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, IdentityError> {
        let session = {
            let mut store = self.inner.store.lock().await;
            let user = match store.accounts.get(&credentials.email) {
                Some(account) if account.password == credentials.password => {
                    account.user.clone()
                }
                _ => {
                    return Err(IdentityError::AuthFailed(
                        "Invalid login credentials".into(),
                    ));
                }
            };
            let session = issue_session(user);
            store.session = Some(session.clone());
            session
        };

        tracing::debug!(user_id = %session.user.id, "memory backend: signed in");
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let had_session = self.inner.store.lock().await.session.take().is_some();
        if !had_session {
            return Err(IdentityError::NotSignedIn);
        }
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }
}

impl ProfileStore for MemoryBackend {
    async fn fetch_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Profile>, IdentityError> {
        self.inner.profile_lookups.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_profiles.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("profile store offline".into()));
        }
        Ok(self.inner.store.lock().await.profiles.get(user_id).cloned())
    }
}

fn issue_session(user: User) -> Session {
    Session {
        access_token: generate_token(),
        token_type: "bearer".into(),
        expires_in: TOKEN_LIFETIME_SECS,
        expires_at: None,
        refresh_token: Some(generate_token()),
        user,
    }
}

/// Generates a random 32-character hex token (128 bits).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
