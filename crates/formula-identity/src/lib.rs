//! Identity types and provider contracts for Formula.
//!
//! This crate is the bottom of the stack. It defines:
//!
//! 1. **Identity types**: [`User`], [`Session`], [`Role`], [`Profile`],
//!    and the change notifications ([`AuthChange`]) a provider emits
//! 2. **Contracts**: the [`IdentityProvider`] and [`ProfileStore`] traits
//!    the session layer is written against
//! 3. **An in-memory backend**: [`MemoryBackend`], for tests and offline use
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← keeps "who is logged in, with what role"
//!     ↕
//! Identity Layer (this crate)  ← types + provider/profile contracts
//!     ↕
//! Backends  ← formula-supabase (HTTP) or MemoryBackend
//! ```

mod error;
mod memory;
mod provider;
mod types;

pub use error::IdentityError;
pub use memory::MemoryBackend;
pub use provider::{AuthChanges, IdentityProvider, ProfileStore};
pub use types::{
    AuthChange, AuthEvent, Credentials, Profile, Role, Session, User, UserId,
};
