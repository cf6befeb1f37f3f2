//! `FormulaApp` builder: wires a backend, the session manager, and the
//! route table together.

use formula_identity::{IdentityProvider, ProfileStore};
use formula_router::{RouteMatch, RouteTable};
use formula_session::{SessionConfig, SessionHandle, SessionSnapshot, spawn_session};
use formula_supabase::{SupabaseClient, SupabaseConfig};

use crate::FormulaError;

/// Builder for a [`FormulaApp`].
///
/// # Example
///
/// ```rust,no_run
/// use formula::prelude::*;
///
/// # async fn run() -> Result<(), FormulaError> {
/// let app = FormulaApp::builder().connect_from_env()?;
/// let state = app.ready().await?;
/// println!("signed in: {}", state.is_signed_in());
/// # Ok(())
/// # }
/// ```
pub struct FormulaAppBuilder {
    session_config: SessionConfig,
    routes: RouteTable,
}

impl FormulaAppBuilder {
    /// Creates a builder with default session settings and the
    /// application's route table.
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            routes: RouteTable::app_routes(),
        }
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Replaces the route table.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Starts the app against any backend that is both an identity
    /// provider and a profile store (e.g. `MemoryBackend`).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build_with<B>(self, backend: B) -> FormulaApp
    where
        B: IdentityProvider + ProfileStore + Clone,
    {
        let session = spawn_session(backend.clone(), backend, self.session_config);
        FormulaApp {
            session,
            routes: self.routes,
        }
    }

    /// Starts the app against a Supabase project.
    pub fn connect(self, config: SupabaseConfig) -> Result<FormulaApp, FormulaError> {
        tracing::info!(url = %config.url, "connecting to supabase");
        let client = SupabaseClient::new(config)?;
        Ok(self.build_with(client))
    }

    /// Starts the app against the Supabase project named by
    /// `SUPABASE_URL` / `SUPABASE_ANON_KEY`.
    pub fn connect_from_env(self) -> Result<FormulaApp, FormulaError> {
        let config = SupabaseConfig::from_env().ok_or_else(|| {
            FormulaError::Config("SUPABASE_URL and SUPABASE_ANON_KEY must be set".into())
        })?;
        self.connect(config)
    }
}

impl Default for FormulaAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running application core: the shared session state plus routes.
///
/// Hand [`session()`](Self::session) clones to every view that needs to
/// know who is logged in.
pub struct FormulaApp {
    session: SessionHandle,
    routes: RouteTable,
}

impl FormulaApp {
    pub fn builder() -> FormulaAppBuilder {
        FormulaAppBuilder::new()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Waits for the initial session fetch and returns the state.
    pub async fn ready(&self) -> Result<SessionSnapshot, FormulaError> {
        Ok(self.session.wait_until_ready().await?)
    }

    /// Resolves a path against the route table.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.resolve(path)
    }

    /// Builds the path for a named route.
    pub fn href(&self, name: &str, params: &[(&str, &str)]) -> Result<String, FormulaError> {
        Ok(self.routes.href(name, params)?)
    }

    /// Stops the session manager.
    pub async fn shutdown(self) -> Result<(), FormulaError> {
        self.session.shutdown().await?;
        Ok(())
    }
}
