//! # Formula
//!
//! Authentication state and routing for the Formula form builder.
//!
//! Formula keeps one answer to "who is logged in, and with what role" in
//! sync with a hosted identity provider (Supabase), and exposes the
//! application's named routes. Views take a [`SessionHandle`] and read
//! `user`, `role`, and `loading` from it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formula::prelude::*;
//!
//! # async fn run() -> Result<(), FormulaError> {
//! formula::init_tracing().ok();
//!
//! let app = FormulaApp::builder().connect_from_env()?;
//! app.ready().await?;
//!
//! app.session().login("ada@example.com", "secret").await?;
//! if app.session().is_admin() {
//!     let team = app.href("team", &[])?;
//!     println!("admin tools at {team}");
//! }
//! # Ok(())
//! # }
//! ```

mod app;
mod error;
mod logging;

pub use app::{FormulaApp, FormulaAppBuilder};
pub use error::FormulaError;
pub use logging::init_tracing;

pub use formula_identity::{
    AuthChange, AuthEvent, Credentials, IdentityError, IdentityProvider,
    MemoryBackend, Profile, ProfileStore, Role, Session, User, UserId,
};
pub use formula_router::{Route, RouteError, RouteMatch, RouteTable, View};
pub use formula_session::{
    RoleLookup, SessionConfig, SessionError, SessionHandle, SessionSnapshot,
    spawn_session,
};
pub use formula_supabase::{SupabaseClient, SupabaseConfig};

/// Everything a front end usually needs, in one import.
pub mod prelude {
    pub use crate::{
        FormulaApp, FormulaError, MemoryBackend, Role, RouteTable, SessionConfig,
        SessionHandle, SessionSnapshot, SupabaseConfig, User, UserId, View,
    };
}
