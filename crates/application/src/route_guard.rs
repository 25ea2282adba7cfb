//! Navigation guard evaluated once per attempted transition.

use std::collections::BTreeMap;
use std::sync::Arc;

use smartclinic_core::{AppError, AppResult};
use smartclinic_domain::{
    ACCESS_DENIED_ROUTE, DEFAULT_DOCUMENT_TITLE, LANDING_ROUTE, LOGIN_ROUTE, RouteDefinition,
    RouteResolution, RouteTable,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::session_service::SessionContext;

/// Decision for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Proceed to the target.
    Allow,
    /// No session; go to the login screen.
    RedirectToLogin,
    /// Guest-only page while signed in; go to the landing page.
    RedirectToLanding,
    /// Requirement not met; go to the access-denied page.
    AccessDenied,
    /// Unknown path; go to the catch-all target.
    RedirectToPath(String),
}

impl NavigationDecision {
    /// Name of the route a redirect lands on.
    #[must_use]
    pub fn redirect_route(&self) -> Option<&str> {
        match self {
            Self::Allow | Self::RedirectToPath(_) => None,
            Self::RedirectToLogin => Some(LOGIN_ROUTE),
            Self::RedirectToLanding => Some(LANDING_ROUTE),
            Self::AccessDenied => Some(ACCESS_DENIED_ROUTE),
        }
    }
}

/// Result of navigating to a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    /// Matched route name, when the path matched one.
    pub route: Option<String>,
    /// `:param` values captured from the path.
    pub params: BTreeMap<String, String>,
    /// What the router should do.
    pub decision: NavigationDecision,
    /// Document title after the transition.
    pub title: String,
}

/// Route guard over the session context.
pub struct RouteGuard {
    session: Arc<SessionContext>,
    routes: RouteTable,
    title: watch::Sender<String>,
}

impl RouteGuard {
    /// Creates a guard for a route table.
    #[must_use]
    pub fn new(session: Arc<SessionContext>, routes: RouteTable) -> Self {
        let (title, _) = watch::channel(DEFAULT_DOCUMENT_TITLE.to_owned());
        Self {
            session,
            routes,
            title,
        }
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the current document title.
    #[must_use]
    pub fn document_title(&self) -> String {
        self.title.borrow().clone()
    }

    /// Subscribes to document title changes.
    #[must_use]
    pub fn subscribe_title(&self) -> watch::Receiver<String> {
        self.title.subscribe()
    }

    /// Resolves a concrete path and guards the transition.
    pub async fn navigate(&self, path: &str) -> GuardOutcome {
        match self.routes.resolve(path) {
            RouteResolution::Matched { route, params } => {
                let decision = self.authorize(route).await;
                GuardOutcome {
                    route: Some(route.name().to_owned()),
                    params,
                    decision,
                    title: self.document_title(),
                }
            }
            RouteResolution::Redirect(target) => {
                debug!(path, target, "no route matched, redirecting");
                GuardOutcome {
                    route: None,
                    params: BTreeMap::new(),
                    decision: NavigationDecision::RedirectToPath(target.to_owned()),
                    title: self.document_title(),
                }
            }
        }
    }

    /// Guards a transition to a named route.
    pub async fn authorize_named(&self, name: &str) -> AppResult<NavigationDecision> {
        let route = self
            .routes
            .find(name)
            .ok_or_else(|| AppError::NotFound(format!("route '{name}' does not exist")))?;

        Ok(self.authorize(route).await)
    }

    /// Guards a transition to `route`.
    pub async fn authorize(&self, route: &RouteDefinition) -> NavigationDecision {
        self.title.send_replace(route.document_title().to_owned());

        let flags = route.flags();
        if flags.public {
            return NavigationDecision::Allow;
        }

        let authenticated = self.session.is_authenticated();
        if flags.requires_auth && !authenticated {
            debug!(route = route.name(), "anonymous navigation redirected to login");
            return NavigationDecision::RedirectToLogin;
        }
        if flags.guest && authenticated {
            return NavigationDecision::RedirectToLanding;
        }

        if !authenticated {
            return NavigationDecision::Allow;
        }

        if let Err(error) = self.session.ensure_user_loaded().await {
            warn!(route = route.name(), error = %error, "failed to load current user");
        }
        if let Err(error) = self.session.refresh_if_stale().await {
            warn!(route = route.name(), error = %error, "failed to refresh permissions");
        }

        if self
            .session
            .check(|grants| route.requirement().is_satisfied_by(grants))
        {
            NavigationDecision::Allow
        } else {
            info!(route = route.name(), "navigation denied");
            NavigationDecision::AccessDenied
        }
    }
}
