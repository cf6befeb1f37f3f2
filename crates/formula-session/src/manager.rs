//! Session manager actor: the single owner of the authentication state.
//!
//! The manager runs in its own Tokio task. Two things can change the
//! state, and both arrive as messages to that one task:
//!
//! - **Commands** from [`SessionHandle`]s (`refresh`, `login`, `logout`)
//!   over an mpsc channel, each with a oneshot reply channel.
//! - **Auth changes** pushed by the identity provider over its broadcast
//!   stream (sign-in elsewhere, sign-out, token refresh).
//!
//! Because the task handles one message at a time, updates never
//! interleave. After each change the task publishes a [`SessionSnapshot`]
//! on a watch channel, which is what every handle reads.

use formula_identity::{
    AuthChange, AuthChanges, Credentials, IdentityError, IdentityProvider,
    ProfileStore, Role, User, UserId,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::role::{RoleLookup, lookup_role};
use crate::{SessionConfig, SessionError, SessionSnapshot};

/// Commands sent to the manager task through its channel.
pub(crate) enum SessionCommand {
    /// Re-fetch the current session and role from the provider.
    Refresh {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Password sign-in.
    Login {
        credentials: Credentials,
        reply: oneshot::Sender<Result<User, SessionError>>,
    },

    /// Sign out through the provider.
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Stop the manager task.
    Shutdown,
}

/// Handle to a running session manager.
///
/// Cheap to clone: an mpsc sender plus a watch receiver. Hand a clone to
/// every consumer that needs to know who is logged in.
///
/// Reads (`snapshot`, `user`, `role`, `is_admin`, ...) never wait; they
/// return the latest published state. Until
/// [`wait_until_ready`](Self::wait_until_ready) has returned, that state
/// may still be the initial "loading" placeholder.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// The latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn role(&self) -> Role {
        self.state.borrow().role
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// `true` iff the current role is [`Role::Admin`].
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// The signed-in user's id, or `None` when logged out.
    pub fn current_user_id(&self) -> Option<UserId> {
        self.state.borrow().current_user_id().cloned()
    }

    /// A receiver that is notified every time the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Waits until the initial session fetch has completed and returns
    /// the state at that point.
    pub async fn wait_until_ready(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| s.initialized)
            .await
            .map_err(|_| SessionError::Unavailable)?;
        Ok(snapshot.clone())
    }

    /// Re-fetches the current session and role.
    ///
    /// If the provider can't be reached the state falls back to logged
    /// out, and the provider's error is returned.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Refresh { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Signs in with email and password.
    ///
    /// On success the state holds the new user and their role by the time
    /// this returns. On failure `user` and `role` are left as they were.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Login {
            credentials: Credentials::new(email, password),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Signs out. The state is logged out by the time this returns.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Logout { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Tells the manager task to stop. Later commands fail with
    /// [`SessionError::Unavailable`]; reads keep returning the last state.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| SessionError::Unavailable)
    }
}

/// The manager's private state. Runs inside a Tokio task.
struct SessionActor<P, S> {
    provider: P,
    profiles: S,
    config: SessionConfig,
    state: SessionSnapshot,
    /// The user id the current `role` was successfully looked up for.
    /// `None` when logged out or when the last lookup failed.
    role_resolved_for: Option<UserId>,
    publisher: watch::Sender<SessionSnapshot>,
    commands: mpsc::Receiver<SessionCommand>,
    changes: AuthChanges,
    changes_open: bool,
}

impl<P: IdentityProvider, S: ProfileStore> SessionActor<P, S> {
    /// Runs the initial fetch, then processes messages until shutdown.
    async fn run(mut self) {
        tracing::info!("session manager started");

        if let Err(e) = self.initialize().await {
            tracing::warn!(error = %e, "initial session fetch failed, starting logged out");
        }

        loop {
            // Notifications are drained before the next command: the
            // provider emits them while a command runs, and they must not
            // land on top of a later command's result.
            tokio::select! {
                biased;

                change = self.changes.recv(), if self.changes_open => {
                    match change {
                        Ok(change) => self.apply_change(change).await,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "missed auth change notifications");
                            if self.config.resync_on_lag {
                                if let Err(e) = self.initialize().await {
                                    tracing::warn!(error = %e, "resync after lag failed");
                                }
                            }
                        }
                        Err(RecvError::Closed) => {
                            tracing::warn!("identity provider closed its change stream");
                            self.changes_open = false;
                        }
                    }
                }
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!("all session handles dropped");
                        break;
                    };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("session manager stopped");
    }

    /// Handles one command. Returns `false` when the task should stop.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Refresh { reply } => {
                let result = self.initialize().await;
                let _ = reply.send(result);
            }
            SessionCommand::Login { credentials, reply } => {
                let result = self.login(credentials).await;
                let _ = reply.send(result);
            }
            SessionCommand::Logout { reply } => {
                let result = self.logout().await;
                let _ = reply.send(result);
            }
            SessionCommand::Shutdown => {
                tracing::info!("session manager shutting down");
                return false;
            }
        }
        true
    }

    /// Fetches the current session and resolves its role.
    ///
    /// Always ends with `loading == false`. A provider failure leaves the
    /// state logged out rather than stuck loading.
    async fn initialize(&mut self) -> Result<(), SessionError> {
        self.set_loading(true);

        let result = match self.provider.get_session().await {
            Ok(Some(session)) => {
                let user = session.user;
                let lookup = lookup_role(&self.profiles, Some(&user.id)).await;
                tracing::debug!(user_id = %user.id, "session restored");
                self.set_user(user, lookup);
                Ok(())
            }
            Ok(None) => {
                tracing::debug!("no current session");
                self.clear_user();
                Ok(())
            }
            Err(e) => {
                self.clear_user();
                Err(SessionError::Identity(e))
            }
        };

        self.state.loading = false;
        self.state.initialized = true;
        self.publish();
        result
    }

    async fn login(&mut self, credentials: Credentials) -> Result<User, SessionError> {
        self.set_loading(true);

        match self.provider.sign_in_with_password(&credentials).await {
            Ok(session) => {
                let user = session.user;
                let lookup = lookup_role(&self.profiles, Some(&user.id)).await;
                tracing::info!(user_id = %user.id, role = %lookup.role(), "login succeeded");
                self.set_user(user.clone(), lookup);
                self.state.loading = false;
                self.publish();
                Ok(user)
            }
            Err(e) => {
                tracing::info!(email = %credentials.email, error = %e, "login failed");
                self.state.loading = false;
                self.publish();
                Err(SessionError::Identity(e))
            }
        }
    }

    async fn logout(&mut self) -> Result<(), SessionError> {
        match self.provider.sign_out().await {
            Ok(()) | Err(IdentityError::NotSignedIn) => {
                tracing::info!(user_id = ?self.state.current_user_id(), "logged out");
                self.clear_user();
                self.publish();
                Ok(())
            }
            Err(e) => Err(SessionError::Identity(e)),
        }
    }

    /// Applies one provider notification.
    async fn apply_change(&mut self, change: AuthChange) {
        tracing::debug!(event = %change.event, "auth change");

        match change.session {
            Some(session) => {
                let user = session.user;
                // Decided against the state held before this event: a
                // token refresh for the same user keeps its role.
                let role_is_current = self.role_resolved_for.as_ref() == Some(&user.id);
                if role_is_current {
                    self.state.user = Some(user);
                } else {
                    let lookup = lookup_role(&self.profiles, Some(&user.id)).await;
                    self.set_user(user, lookup);
                }
            }
            None => self.clear_user(),
        }

        self.state.loading = false;
        self.publish();
    }

    /// Installs `user` together with the outcome of its role lookup, so a
    /// new user is never published carrying the previous user's role.
    fn set_user(&mut self, user: User, lookup: RoleLookup) {
        match &lookup {
            RoleLookup::Resolved(_) => {
                self.role_resolved_for = Some(user.id.clone());
            }
            RoleLookup::Failed(reason) => {
                tracing::warn!(
                    user_id = %user.id,
                    %reason,
                    "role lookup failed, falling back to user role"
                );
                self.role_resolved_for = None;
            }
        }
        self.state.role = lookup.role();
        self.state.user = Some(user);
    }

    fn clear_user(&mut self) {
        self.state.user = None;
        self.state.role = Role::User;
        self.role_resolved_for = None;
    }

    fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
        self.publish();
    }

    fn publish(&self) {
        // `send_replace` stores the value even when no receiver is left.
        self.publisher.send_replace(self.state.clone());
    }
}

/// Spawns a session manager and returns a handle to it.
///
/// The provider subscription is opened before the task starts, so no
/// change that happens during the initial fetch is lost. The initial fetch
/// itself starts immediately; consumers should call
/// [`SessionHandle::wait_until_ready`] before treating `user` / `role` as
/// final.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_session<P, S>(provider: P, profiles: S, config: SessionConfig) -> SessionHandle
where
    P: IdentityProvider,
    S: ProfileStore,
{
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    let (state_tx, state_rx) = watch::channel(SessionSnapshot::initial());
    let changes = provider.subscribe();

    let actor = SessionActor {
        provider,
        profiles,
        config,
        state: SessionSnapshot::initial(),
        role_resolved_for: None,
        publisher: state_tx,
        commands: command_rx,
        changes,
        changes_open: true,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        commands: command_tx,
        state: state_rx,
    }
}
