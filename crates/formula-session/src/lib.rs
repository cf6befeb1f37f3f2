//! Authentication session state for Formula.
//!
//! This crate keeps one answer to "who is logged in, and with what role"
//! consistent across two independent sources of change: explicit calls
//! (`login`, `refresh`, `logout`) and notifications pushed by the identity
//! provider.
//!
//! # Key types
//!
//! - [`spawn_session`]: starts a manager task and returns its handle
//! - [`SessionHandle`]: read the state, send commands, subscribe
//! - [`SessionSnapshot`]: the published state (`user`, `role`, `loading`)
//! - [`RoleLookup`]: explicit result of resolving a role from a profile
//!
//! # Example
//!
//! ```rust
//! use formula_identity::{MemoryBackend, Profile, User, UserId};
//! use formula_session::{SessionConfig, spawn_session};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), formula_session::SessionError> {
//! let backend = MemoryBackend::new();
//! backend.add_account(User::new("u1", "ada@example.com"), "secret").await;
//! backend.set_profile(UserId::from("u1"), Profile::with_role("admin")).await;
//!
//! let session = spawn_session(backend.clone(), backend, SessionConfig::default());
//! session.wait_until_ready().await?;
//!
//! session.login("ada@example.com", "secret").await?;
//! assert!(session.is_admin());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod manager;
mod role;
mod state;

pub use config::SessionConfig;
pub use error::SessionError;
pub use manager::{SessionHandle, spawn_session};
pub use role::{RoleLookup, lookup_role};
pub use state::SessionSnapshot;
