//! Connection settings for a Supabase project.

use std::time::Duration;

/// Default HTTP request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the project lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`. A trailing slash is
    /// ignored.
    pub url: String,

    /// The project's public ("anon") API key.
    pub anon_key: String,

    /// Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from `SUPABASE_URL` and `SUPABASE_ANON_KEY`, with an optional
    /// `SUPABASE_TIMEOUT_SECS`.
    /// Returns `None` if either required variable is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
        let mut config = Self::new(url, anon_key);
        if let Some(secs) = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        Some(config)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.url)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "anon");
        assert_eq!(config.url, "https://demo.supabase.co");
        assert_eq!(
            config.auth_url("token"),
            "https://demo.supabase.co/auth/v1/token"
        );
        assert_eq!(
            config.rest_url("profiles"),
            "https://demo.supabase.co/rest/v1/profiles"
        );
    }

    #[test]
    fn test_new_uses_default_timeout() {
        let config = SupabaseConfig::new("http://localhost:54321", "anon");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}
