//! HTTP client for the Supabase auth (GoTrue) and data (PostgREST) APIs.
//!
//! The client keeps the current session in memory, the way the browser
//! SDK does, and uses its access token for profile queries so row-level
//! security sees the signed-in user.

use std::sync::Arc;

use formula_identity::{
    AuthChange, AuthChanges, AuthEvent, Credentials, IdentityError,
    IdentityProvider, Profile, ProfileStore, Session, UserId,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};

use crate::SupabaseConfig;

/// How many change notifications a slow subscriber may fall behind.
const EVENT_BUFFER: usize = 32;

/// Error body shapes GoTrue and PostgREST use. Different versions fill
/// different fields, so every one is optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

struct Inner {
    http: reqwest::Client,
    config: SupabaseConfig,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

/// Supabase-backed [`IdentityProvider`] and [`ProfileStore`].
///
/// Cheap to clone; clones share one HTTP connection pool, one stored
/// session, and one change stream.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<Inner>,
}

impl SupabaseClient {
    /// Builds a client for the given project.
    ///
    /// # Errors
    /// Returns [`IdentityError::Transport`] if the HTTP client can't be
    /// constructed (e.g. TLS backend initialisation failed).
    pub fn new(config: SupabaseConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        tracing::debug!(url = %config.url, "supabase client created");

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                session: RwLock::new(None),
                events,
            }),
        })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.inner.config
    }

    /// Installs a session obtained elsewhere (e.g. from a magic link or a
    /// restored token pair) and announces it as `SignedIn`.
    pub async fn set_session(&self, session: Session) {
        *self.inner.session.write().await = Some(session.clone());
        self.emit(AuthEvent::SignedIn, Some(session));
    }

    /// The current access token, if signed in.
    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.inner.events.send(AuthChange { event, session });
    }

    /// Bearer token for data requests: the user's when signed in, the anon
    /// key otherwise.
    async fn bearer(&self) -> String {
        self.access_token()
            .await
            .unwrap_or_else(|| self.inner.config.anon_key.clone())
    }
}

impl IdentityProvider for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.inner.session.read().await.clone())
    }

    fn subscribe(&self) -> AuthChanges {
        self.inner.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, IdentityError> {
        let resp = self
            .inner
            .http
            .post(self.inner.config.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.inner.config.anon_key)
            .json(credentials)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body, status);
            tracing::debug!(%status, %message, "password sign-in rejected");
            // GoTrue answers bad credentials with 400. Other 4xx codes
            // (rate limits, validation) are not a verdict on the password.
            return Err(if status == StatusCode::BAD_REQUEST {
                IdentityError::AuthFailed(message)
            } else {
                IdentityError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let session: Session = resp
            .json()
            .await
            .map_err(|e| IdentityError::Decode(e.to_string()))?;

        *self.inner.session.write().await = Some(session.clone());
        tracing::info!(user_id = %session.user.id, "signed in");
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let token = self.access_token().await.ok_or(IdentityError::NotSignedIn)?;

        let resp = self
            .inner
            .http
            .post(self.inner.config.auth_url("logout"))
            .header("apikey", &self.inner.config.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        // 401/403/404 mean the token is already dead server-side; the
        // local session is cleared all the same.
        let already_gone = matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        );
        if !status.is_success() && !already_gone {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        *self.inner.session.write().await = None;
        tracing::info!("signed out");
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }
}

impl ProfileStore for SupabaseClient {
    async fn fetch_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Profile>, IdentityError> {
        let filter = format!("eq.{user_id}");
        let resp = self
            .inner
            .http
            .get(self.inner.config.rest_url("profiles"))
            .query(&[("select", "role"), ("id", filter.as_str())])
            .header("apikey", &self.inner.config.anon_key)
            .bearer_auth(self.bearer().await)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        let rows: Vec<Profile> = resp
            .json()
            .await
            .map_err(|e| IdentityError::Decode(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

/// Extracts a human-readable message from an error response body,
/// falling back to the status text.
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(body, StatusCode::BAD_REQUEST),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_error_message_reads_gotrue_msg_field() {
        let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(body, StatusCode::BAD_REQUEST),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_error_message_reads_postgrest_message_field() {
        let body = r#"{"code":"42P01","message":"relation \"profiles\" does not exist"}"#;
        assert!(error_message(body, StatusCode::NOT_FOUND).contains("profiles"));
    }

    #[test]
    fn test_error_message_falls_back_to_status_reason() {
        assert_eq!(
            error_message("<html>bad gateway</html>", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
    }

    #[tokio::test]
    async fn test_new_client_starts_without_session() {
        let client =
            SupabaseClient::new(SupabaseConfig::new("http://127.0.0.1:1", "anon")).unwrap();

        assert_eq!(client.get_session().await.unwrap(), None);
        assert!(matches!(
            client.sign_out().await,
            Err(IdentityError::NotSignedIn)
        ));
    }
}
