//! Error types for the routing layer.

/// Errors produced when building a path from a route name.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No route is registered under this name.
    #[error("no route named {0:?}")]
    UnknownRoute(String),

    /// The route has a `:param` segment that wasn't supplied.
    #[error("route {route:?} needs parameter {param:?}")]
    MissingParam { route: String, param: String },

    /// A supplied parameter value is empty.
    #[error("invalid value {value:?} for parameter {param:?}")]
    InvalidParam { param: String, value: String },
}
