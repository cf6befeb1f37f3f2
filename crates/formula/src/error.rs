//! Unified error type for the Formula workspace.

use formula_identity::IdentityError;
use formula_router::RouteError;
use formula_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `formula` meta-crate you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    /// An identity-backend error (sign-in, network, decode).
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A session-layer error (login rejected, manager stopped).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A routing error (unknown route, missing parameter).
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
