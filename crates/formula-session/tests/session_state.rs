//! Integration tests for the session manager, driven by the in-memory
//! identity backend.

use std::time::Duration;

use formula_identity::{AuthEvent, MemoryBackend, Profile, Role, Session, User, UserId};
use formula_session::{
    SessionConfig, SessionError, SessionHandle, SessionSnapshot, spawn_session,
};

// =========================================================================
// Helpers
// =========================================================================

fn uid(id: &str) -> UserId {
    UserId::from(id)
}

/// A backend with two accounts: `u1` (admin profile) and `u2` (no profile).
async fn backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend
        .add_account(User::new("u1", "ada@example.com"), "secret")
        .await;
    backend
        .add_account(User::new("u2", "bob@example.com"), "hunter2")
        .await;
    backend
        .set_profile(uid("u1"), Profile::with_role("admin"))
        .await;
    backend
}

async fn start(backend: &MemoryBackend) -> SessionHandle {
    let handle = spawn_session(backend.clone(), backend.clone(), SessionConfig::default());
    tokio::time::timeout(Duration::from_secs(5), handle.wait_until_ready())
        .await
        .expect("manager should become ready")
        .expect("manager should be running");
    handle
}

/// Waits until the published state satisfies `pred`.
async fn wait_for(
    handle: &SessionHandle,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("state change timed out")
        .expect("manager should be running");
    snapshot.clone()
}

// =========================================================================
// Initialization
// =========================================================================

#[tokio::test]
async fn test_initialize_existing_admin_session_is_admin() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u1", "ada@example.com")).await;

    let session = start(&backend).await;

    let snap = session.snapshot();
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
    assert_eq!(snap.role, Role::Admin);
    assert!(!snap.loading);
    assert!(session.is_admin());
}

#[tokio::test]
async fn test_initialize_session_without_profile_is_user() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u2", "bob@example.com")).await;

    let session = start(&backend).await;

    assert_eq!(session.current_user_id(), Some(uid("u2")));
    assert_eq!(session.role(), Role::User);
}

#[tokio::test]
async fn test_initialize_without_session_is_logged_out_user() {
    let backend = backend().await;

    let session = start(&backend).await;

    assert!(session.user().is_none());
    assert!(session.current_user_id().is_none());
    assert_eq!(session.role(), Role::User);
    assert!(!session.loading());
}

#[tokio::test]
async fn test_initialize_fetch_failure_degrades_to_logged_out() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    backend.fail_session_fetch(true);

    let session = start(&backend).await;

    let snap = session.snapshot();
    assert!(snap.user.is_none());
    assert_eq!(snap.role, Role::User);
    assert!(!snap.loading, "loading must not stay stuck");
    assert!(snap.initialized);
}

#[tokio::test]
async fn test_refresh_fetch_failure_returns_error_and_logs_out() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    let session = start(&backend).await;
    assert!(session.is_admin());

    backend.fail_session_fetch(true);
    let result = session.refresh().await;

    assert!(matches!(result, Err(SessionError::Identity(_))));
    assert!(session.user().is_none());
    assert_eq!(session.role(), Role::User);
    assert!(!session.loading());
}

#[tokio::test]
async fn test_refresh_twice_without_change_is_idempotent() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    let session = start(&backend).await;

    session.refresh().await.expect("first refresh");
    let first = session.snapshot();
    session.refresh().await.expect("second refresh");
    let second = session.snapshot();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_initialize_role_lookup_failure_degrades_to_user() {
    let backend = backend().await;
    backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    backend.fail_profile_fetch(true);

    let session = start(&backend).await;

    assert_eq!(session.current_user_id(), Some(uid("u1")));
    assert_eq!(session.role(), Role::User);
}

// =========================================================================
// login()
// =========================================================================

#[tokio::test]
async fn test_login_valid_admin_sets_user_and_role() {
    let backend = backend().await;
    let session = start(&backend).await;

    let user = session
        .login("ada@example.com", "secret")
        .await
        .expect("login should succeed");

    assert_eq!(user.id, uid("u1"));
    let snap = session.snapshot();
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
    assert_eq!(snap.role, Role::Admin);
    assert!(!snap.loading);
}

#[tokio::test]
async fn test_login_invalid_credentials_leaves_state_untouched() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();
    let before = session.snapshot();

    let result = session.login("ada@example.com", "wrong").await;

    match result {
        Err(SessionError::Identity(e)) => assert!(e.is_auth_failure()),
        other => panic!("expected auth failure, got {other:?}"),
    }
    let after = session.snapshot();
    assert_eq!(after.user, before.user);
    assert_eq!(after.role, before.role);
    assert!(!after.loading);
}

#[tokio::test]
async fn test_login_invalid_credentials_when_logged_out_stays_logged_out() {
    let backend = backend().await;
    let session = start(&backend).await;

    let result = session.login("nobody@example.com", "x").await;

    assert!(result.is_err());
    assert!(session.user().is_none());
    assert_eq!(session.role(), Role::User);
}

#[tokio::test]
async fn test_login_switching_users_resolves_new_role() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();
    assert!(session.is_admin());

    session.login("bob@example.com", "hunter2").await.unwrap();

    assert_eq!(session.current_user_id(), Some(uid("u2")));
    assert!(!session.is_admin());
}

// =========================================================================
// Provider change events
// =========================================================================

#[tokio::test]
async fn test_sign_out_event_resets_admin_to_user() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();
    assert!(session.is_admin());

    backend.revoke_session().await;

    let snap = wait_for(&session, |s| s.user.is_none()).await;
    assert_eq!(snap.role, Role::User);
    assert!(!snap.loading);
}

#[tokio::test]
async fn test_sign_in_event_from_elsewhere_updates_state() {
    let backend = backend().await;
    let session = start(&backend).await;

    backend.sign_in_as(User::new("u1", "ada@example.com")).await;

    let snap = wait_for(&session, |s| s.user.is_some()).await;
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
    assert_eq!(snap.role, Role::Admin);
}

#[tokio::test]
async fn test_token_refresh_for_same_user_skips_role_lookup() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();
    assert_eq!(backend.profile_lookups(), 1);

    backend.refresh_session().await.expect("signed in");
    // Events are delivered in order, so once u2 shows up the refresh
    // (and the login's own SIGNED_IN) have been applied.
    backend.sign_in_as(User::new("u2", "bob@example.com")).await;
    wait_for(&session, |s| s.current_user_id() == Some(&uid("u2"))).await;

    // One lookup for the login, one for u2; none for the refresh.
    assert_eq!(backend.profile_lookups(), 2);
}

#[tokio::test]
async fn test_failed_lookup_is_retried_on_next_event() {
    let backend = backend().await;
    let session = start(&backend).await;
    backend.fail_profile_fetch(true);
    session.login("ada@example.com", "secret").await.unwrap();
    assert_eq!(session.role(), Role::User);

    backend.fail_profile_fetch(false);
    backend.refresh_session().await.expect("signed in");

    let snap = wait_for(&session, |s| s.role == Role::Admin).await;
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
}

#[tokio::test]
async fn test_sign_in_event_for_new_user_never_carries_old_role() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();
    let mut rx = session.subscribe();
    let _ = rx.borrow_and_update();

    backend.sign_in_as(User::new("u2", "bob@example.com")).await;

    let snap = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.expect("manager running");
            let snap = rx.borrow_and_update().clone();
            if snap.current_user_id() == Some(&uid("u2")) {
                return snap;
            }
        }
    })
    .await
    .expect("u2 should appear");
    assert_eq!(snap.role, Role::User);
}

#[tokio::test]
async fn test_explicit_event_without_session_logs_out() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();

    backend.emit(AuthEvent::SignedOut, None);

    let snap = wait_for(&session, |s| s.user.is_none()).await;
    assert_eq!(snap.role, Role::User);
}

// =========================================================================
// Falling behind the change stream
// =========================================================================

/// Emits far more notifications than the provider buffers, without
/// yielding, so the manager's receiver lags.
fn flood(backend: &MemoryBackend, session: &Session) {
    for _ in 0..100 {
        backend.emit(AuthEvent::TokenRefreshed, Some(session.clone()));
    }
}

#[tokio::test]
async fn test_lagged_notifications_trigger_session_refetch() {
    let backend = backend().await;
    let signed_in = backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    let session = start(&backend).await;
    assert_eq!(backend.profile_lookups(), 1);

    flood(&backend, &signed_in);
    // Commands run after pending notifications, so this returns once the
    // backlog has been handled.
    session.refresh().await.unwrap();

    let snap = session.snapshot();
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
    assert_eq!(snap.role, Role::Admin);
    assert!(!snap.loading);
    // Startup, the refetch after the lag, and the explicit refresh.
    assert_eq!(backend.profile_lookups(), 3);
}

#[tokio::test]
async fn test_lagged_notifications_without_resync_keep_state() {
    let backend = backend().await;
    let signed_in = backend.sign_in_as(User::new("u1", "ada@example.com")).await;
    let config = SessionConfig {
        resync_on_lag: false,
        ..SessionConfig::default()
    };
    let session = spawn_session(backend.clone(), backend.clone(), config);
    session.wait_until_ready().await.unwrap();
    assert_eq!(backend.profile_lookups(), 1);

    flood(&backend, &signed_in);
    session.refresh().await.unwrap();

    let snap = session.snapshot();
    assert_eq!(snap.current_user_id(), Some(&uid("u1")));
    assert_eq!(snap.role, Role::Admin);
    assert!(!snap.loading);
    // Startup and the explicit refresh only.
    assert_eq!(backend.profile_lookups(), 2);
}

// =========================================================================
// logout() / shutdown()
// =========================================================================

#[tokio::test]
async fn test_logout_clears_state() {
    let backend = backend().await;
    let session = start(&backend).await;
    session.login("ada@example.com", "secret").await.unwrap();

    session.logout().await.expect("logout should succeed");

    assert!(session.user().is_none());
    assert_eq!(session.role(), Role::User);
}

#[tokio::test]
async fn test_logout_when_already_logged_out_is_ok() {
    let backend = backend().await;
    let session = start(&backend).await;

    session.logout().await.expect("logout is idempotent");

    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_commands_after_shutdown_are_unavailable() {
    let backend = backend().await;
    let session = start(&backend).await;

    session.shutdown().await.unwrap();
    // Give the task a moment to exit and drop its receiver.
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match session.refresh().await {
                Err(SessionError::Unavailable) => break,
                _ => tokio::task::yield_now().await,
            }
        }
    })
    .await;

    assert!(result.is_ok(), "refresh should fail once the manager stopped");
    assert!(!session.loading(), "last state stays readable");
}
