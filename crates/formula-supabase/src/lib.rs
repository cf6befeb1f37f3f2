//! Supabase identity backend for Formula.
//!
//! [`SupabaseClient`] implements the identity layer's
//! [`IdentityProvider`](formula_identity::IdentityProvider) and
//! [`ProfileStore`](formula_identity::ProfileStore) traits on top of a
//! hosted Supabase project:
//!
//! - password sign-in and sign-out through the auth API (`/auth/v1`)
//! - the `profiles` table through the REST API (`/rest/v1`)
//! - sign-in / sign-out notifications on an in-process change stream
//!
//! Token refresh is out of scope: sessions live until they are replaced
//! or signed out.

mod client;
mod config;

pub use client::SupabaseClient;
pub use config::SupabaseConfig;
