//! Route definitions and matching.

use std::collections::HashMap;
use std::fmt;

use crate::RouteError;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// The view component a route renders. Views live outside this
/// workspace; this is just the name a front end dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    FormList,
    Login,
    SetPassword,
    FormBuilder,
    CreateForm,
    SummaryPage,
    TeamManagement,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Unique name used for navigation (`href`).
    pub name: &'static str,

    /// Path pattern. Segments starting with `:` capture a parameter.
    pub path: &'static str,

    pub view: View,

    /// Whether the view's code is loaded on first navigation rather than
    /// bundled up front.
    pub lazy: bool,
}

impl Route {
    const fn new(name: &'static str, path: &'static str, view: View) -> Self {
        Self {
            name,
            path,
            view,
            lazy: false,
        }
    }

    const fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    fn segments(&self) -> impl Iterator<Item = &'static str> {
        split_path(self.path)
    }

    /// Names of the `:param` segments, in order.
    pub fn params(&self) -> Vec<&'static str> {
        self.segments()
            .filter_map(|s| s.strip_prefix(':'))
            .collect()
    }

    /// Matches `segments` against this route's pattern, collecting
    /// decoded parameters on success.
    fn matches(&self, segments: &[&str]) -> Option<HashMap<String, String>> {
        let pattern: Vec<&str> = self.segments().collect();
        if pattern.len() != segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    let value = urlencoding::decode(actual).ok()?;
                    params.insert(name.to_string(), value.into_owned());
                }
                None if expected.eq_ignore_ascii_case(actual) => {}
                None => return None,
            }
        }
        Some(params)
    }
}

/// A successful [`RouteTable::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: HashMap<String, String>,
}

impl RouteMatch<'_> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// An ordered list of routes. The first route that matches a path wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// The application's routes.
    pub fn app_routes() -> Self {
        Self {
            routes: vec![
                Route::new("home", "/", View::FormList),
                Route::new("login", "/Login", View::Login),
                Route::new("set-password", "/set-password", View::SetPassword),
                Route::new("render-form", "/form/:slug", View::FormBuilder),
                // Reuses the create view in edit mode.
                Route::new("EditForm", "/edit/:slug", View::CreateForm).lazy(),
                Route::new("summary", "/summary", View::SummaryPage),
                Route::new("create", "/create", View::CreateForm),
                Route::new("team", "/team", View::TeamManagement),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks a route up by name.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Finds the route a path belongs to.
    ///
    /// The query string and fragment are ignored, as is a single trailing
    /// slash. Static segments match ignoring ASCII case. Parameters must be
    /// non-empty and are percent-decoded; one that isn't valid UTF-8 once
    /// decoded means no match.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        if !path.starts_with('/') {
            return None;
        }
        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };

        let segments: Vec<&str> = split_path(trimmed).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        self.routes.iter().find_map(|route| {
            route
                .matches(&segments)
                .map(|params| RouteMatch { route, params })
        })
    }

    /// Builds the path for a named route.
    ///
    /// # Errors
    /// - [`RouteError::UnknownRoute`]: no route has this name
    /// - [`RouteError::MissingParam`]: a `:param` wasn't supplied
    /// - [`RouteError::InvalidParam`]: a value is empty
    ///
    /// Parameter values are percent-encoded, so any non-empty value
    /// resolves back to the same route.
    pub fn href(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        let route = self
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let mut out = String::new();
        for segment in route.segments() {
            out.push('/');
            match segment.strip_prefix(':') {
                Some(param) => {
                    let value = params
                        .iter()
                        .find(|(k, _)| *k == param)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| RouteError::MissingParam {
                            route: name.to_string(),
                            param: param.to_string(),
                        })?;
                    if value.is_empty() {
                        return Err(RouteError::InvalidParam {
                            param: param.to_string(),
                            value: value.to_string(),
                        });
                    }
                    out.push_str(&urlencoding::encode(value));
                }
                None => out.push_str(segment),
            }
        }

        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }
}

/// Splits an absolute path into its segments. `"/"` has none.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let body = path.strip_prefix('/').unwrap_or(path);
    body.split('/').filter(move |_| !body.is_empty())
}
