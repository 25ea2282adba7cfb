use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use smartclinic_core::UserIdentity;
use smartclinic_domain::{
    AccessRequirement, ClinicCatalog, Language, NavigationEntry, filter_navigation,
};
use tokio::sync::watch;
use tracing::debug;

use crate::session_service::SessionContext;

/// Summary of the signed-in user's access, used by profile and debug views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    /// Signed-in user, if loaded.
    pub user: Option<UserIdentity>,
    /// Permission tokens.
    pub permissions: Vec<String>,
    /// Role values.
    pub roles: Vec<String>,
    /// Permission tokens grouped by resource.
    pub permissions_by_category: BTreeMap<String, Vec<String>>,
}

/// Permission-filtered navigation and feature gates for the current session.
pub struct NavigationService {
    session: Arc<SessionContext>,
    catalog: Arc<ClinicCatalog>,
    language: watch::Sender<Language>,
}

impl NavigationService {
    /// Creates a navigation service.
    #[must_use]
    pub fn new(session: Arc<SessionContext>, catalog: Arc<ClinicCatalog>, language: Language) -> Self {
        let (language, _) = watch::channel(language);
        Self {
            session,
            catalog,
            language,
        }
    }

    /// Returns the display language.
    #[must_use]
    pub fn language(&self) -> Language {
        *self.language.borrow()
    }

    /// Switches the display language.
    pub fn set_language(&self, language: Language) {
        let changed = self.language.send_if_modified(|current| {
            let changed = *current != language;
            *current = language;
            changed
        });
        if changed {
            debug!(language = language.as_str(), "navigation language changed");
        }
    }

    /// Subscribes to language changes.
    #[must_use]
    pub fn subscribe_language(&self) -> watch::Receiver<Language> {
        self.language.subscribe()
    }

    /// Sidebar entries visible to the current session.
    #[must_use]
    pub fn navigation_entries(&self) -> Vec<NavigationEntry> {
        let grants = self.session.grants();
        filter_navigation(&self.catalog.navigation, &grants, self.language())
    }

    /// Bottom bar entries visible to the current session.
    #[must_use]
    pub fn bottom_navigation_entries(&self) -> Vec<NavigationEntry> {
        let grants = self.session.grants();
        filter_navigation(&self.catalog.bottom_navigation, &grants, self.language())
    }

    /// Returns whether the session passes a page-level requirement.
    #[must_use]
    pub fn can_access(&self, requirement: &AccessRequirement) -> bool {
        self.session
            .check(|grants| requirement.is_satisfied_by(grants))
    }

    /// Returns whether a named UI feature is available. Unknown features are
    /// available.
    #[must_use]
    pub fn can_use_feature(&self, feature: &str) -> bool {
        self.session
            .check(|grants| self.catalog.features.can_use(feature, grants))
    }

    /// Names of the features available to the session.
    #[must_use]
    pub fn available_features(&self) -> Vec<String> {
        let grants = self.session.grants();
        self.catalog
            .features
            .available_features(&grants)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Builds the access summary of the current session.
    #[must_use]
    pub fn access_summary(&self) -> AccessSummary {
        let state = self.session.snapshot();
        AccessSummary {
            permissions_by_category: state.grants.permissions_by_category(),
            permissions: state.grants.permissions().to_vec(),
            roles: state
                .grants
                .roles()
                .iter()
                .map(|role| role.as_str().to_owned())
                .collect(),
            user: state.user,
        }
    }
}
