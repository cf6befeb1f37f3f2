//! The application's named routes.
//!
//! Routing here is pure configuration plus path matching: which view a
//! path belongs to, and what its `:slug` is. There are no route guards;
//! views check the session state themselves.
//!
//! ```rust
//! use formula_router::{RouteTable, View};
//!
//! let routes = RouteTable::app_routes();
//! let hit = routes.resolve("/form/customer-survey").unwrap();
//! assert_eq!(hit.route.name, "render-form");
//! assert_eq!(hit.route.view, View::FormBuilder);
//! assert_eq!(hit.param("slug"), Some("customer-survey"));
//! ```

mod error;
mod route;

pub use error::RouteError;
pub use route::{Route, RouteMatch, RouteTable, View};
