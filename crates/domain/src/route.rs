use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smartclinic_core::{AppError, AppResult, NonEmptyString};

use crate::requirement::AccessRequirement;

/// Route name of the login screen.
pub const LOGIN_ROUTE: &str = "Login";
/// Route name of the default landing page for signed-in users.
pub const LANDING_ROUTE: &str = "Dashboard";
/// Route name of the access-denied page.
pub const ACCESS_DENIED_ROUTE: &str = "AccessDenied";
/// Page title used when a transition targets no known route.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Clinic Management";

/// Authentication flags attached to route metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFlags {
    /// Reachable without a session, no further checks.
    #[serde(default)]
    pub public: bool,
    /// Redirects anonymous users to the login screen.
    #[serde(default)]
    pub requires_auth: bool,
    /// Guest-only page such as login or register.
    #[serde(default)]
    pub guest: bool,
}

impl RouteFlags {
    /// Flags of a page that needs a session.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    fn merged_with(self, parent: Self) -> Self {
        Self {
            public: self.public || parent.public,
            requires_auth: self.requires_auth || parent.requires_auth,
            guest: self.guest || parent.guest,
        }
    }
}

/// Router entry with its access metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    name: NonEmptyString,
    path: String,
    title: Option<String>,
    flags: RouteFlags,
    requirement: AccessRequirement,
}

impl RouteDefinition {
    /// Creates a route with no flags and no requirement.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> AppResult<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(AppError::Validation(format!(
                "route path '{path}' must be absolute"
            )));
        }

        Ok(Self {
            name: NonEmptyString::new(name)?,
            path,
            title: None,
            flags: RouteFlags::default(),
            requirement: AccessRequirement::None,
        })
    }

    /// Sets the page title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.trim().is_empty()).then_some(title);
        self
    }

    /// Replaces the authentication flags.
    #[must_use]
    pub fn with_flags(mut self, flags: RouteFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Marks the route public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.flags.public = true;
        self
    }

    /// Marks the route guest-only.
    #[must_use]
    pub fn guest(mut self) -> Self {
        self.flags.guest = true;
        self
    }

    /// Marks the route as needing a session.
    #[must_use]
    pub fn requires_auth(mut self) -> Self {
        self.flags.requires_auth = true;
        self
    }

    /// Sets the access requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: AccessRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Returns the route name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the path pattern.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the configured title, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the effective flags.
    #[must_use]
    pub fn flags(&self) -> RouteFlags {
        self.flags
    }

    /// Returns the access requirement.
    #[must_use]
    pub fn requirement(&self) -> &AccessRequirement {
        &self.requirement
    }

    /// Title shown while this route is active: the configured title, else the
    /// route name.
    #[must_use]
    pub fn document_title(&self) -> &str {
        self.title.as_deref().unwrap_or(self.name.as_str())
    }

    fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = segments(self.path.as_str()).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, value) in pattern.into_iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(param) => {
                    params.insert(param.to_owned(), value.to_owned());
                }
                None if expected == value => {}
                None => return None,
            }
        }

        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
}

/// Outcome of resolving a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResolution<'a> {
    /// The path matched a route.
    Matched {
        /// Matched route.
        route: &'a RouteDefinition,
        /// Values captured by `:param` segments.
        params: BTreeMap<String, String>,
    },
    /// No route matched; the catch-all redirect applies.
    Redirect(&'a str),
}

/// Ordered router table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
    fallback_path: String,
}

impl RouteTable {
    /// Starts building a table.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Returns the routes in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Finds a route by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|route| route.name() == name)
    }

    /// Resolves a concrete path to the first matching route.
    #[must_use]
    pub fn resolve(&self, path: &str) -> RouteResolution<'_> {
        self.routes
            .iter()
            .find_map(|route| {
                route
                    .match_path(path)
                    .map(|params| RouteResolution::Matched { route, params })
            })
            .unwrap_or(RouteResolution::Redirect(self.fallback_path.as_str()))
    }
}

/// Builder for [`RouteTable`].
#[derive(Debug, Clone, Default)]
pub struct RouteTableBuilder {
    routes: Vec<RouteDefinition>,
    fallback_path: Option<String>,
}

impl RouteTableBuilder {
    /// Adds a top-level route.
    #[must_use]
    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds child routes of a layout; the layout flags are merged into each
    /// child.
    #[must_use]
    pub fn layout(mut self, flags: RouteFlags, children: Vec<RouteDefinition>) -> Self {
        self.routes.extend(children.into_iter().map(|child| {
            let merged = child.flags().merged_with(flags);
            child.with_flags(merged)
        }));
        self
    }

    /// Sets the catch-all redirect target. Defaults to `/`.
    #[must_use]
    pub fn fallback(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    /// Validates route names and builds the table.
    pub fn build(self) -> AppResult<RouteTable> {
        let mut names = BTreeSet::new();
        for route in &self.routes {
            if !names.insert(route.name()) {
                return Err(AppError::Conflict(format!(
                    "route name '{}' is declared twice",
                    route.name()
                )));
            }
        }

        Ok(RouteTable {
            routes: self.routes,
            fallback_path: self.fallback_path.unwrap_or_else(|| "/".to_owned()),
        })
    }
}
