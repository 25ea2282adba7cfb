use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::requirement::MatchMode;
use crate::security::AccessGrants;

/// Fine-grained UI feature gate over exact permission tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequirement {
    /// Exact tokens checked by the gate.
    pub permissions: Vec<String>,
    /// How the tokens combine.
    #[serde(default)]
    pub mode: MatchMode,
}

impl FeatureRequirement {
    /// Gate satisfied by any of the tokens.
    #[must_use]
    pub fn any_of<I>(permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            mode: MatchMode::Any,
        }
    }

    /// Gate that needs every token.
    #[must_use]
    pub fn all_of<I>(permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            mode: MatchMode::All,
        }
    }

    /// Returns whether the gate is open. An empty token list opens it.
    #[must_use]
    pub fn is_satisfied_by(&self, grants: &AccessGrants) -> bool {
        match self.mode {
            MatchMode::Any => grants.has_any_exact(&self.permissions),
            MatchMode::All => grants.has_all_exact(&self.permissions),
        }
    }
}

/// Named feature gates, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCatalog(BTreeMap<String, FeatureRequirement>);

impl FeatureCatalog {
    /// Creates a catalog from `(feature key, requirement)` pairs.
    #[must_use]
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, FeatureRequirement)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(key, requirement)| (key.into(), requirement))
                .collect(),
        )
    }

    /// Returns the gate for a feature key.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&FeatureRequirement> {
        self.0.get(feature)
    }

    /// Returns the feature keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns whether the feature is available. Unknown features are open.
    #[must_use]
    pub fn can_use(&self, feature: &str, grants: &AccessGrants) -> bool {
        self.get(feature)
            .is_none_or(|requirement| requirement.is_satisfied_by(grants))
    }

    /// Feature keys available for the grants.
    #[must_use]
    pub fn available_features(&self, grants: &AccessGrants) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, requirement)| requirement.is_satisfied_by(grants))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureCatalog, FeatureRequirement};
    use crate::security::AccessGrants;

    fn catalog() -> FeatureCatalog {
        FeatureCatalog::new([
            ("MARK_BILL_PAID", FeatureRequirement::any_of(["mark-bill-paid", "bill"])),
            ("CREATE_PATIENT", FeatureRequirement::any_of(["create-patient"])),
            (
                "MANAGE_PATIENT",
                FeatureRequirement::all_of(["edit-patient", "delete-patient"]),
            ),
            ("OPEN", FeatureRequirement::default()),
        ])
    }

    #[test]
    fn feature_gates_use_exact_tokens() {
        let grants = AccessGrants::new(vec!["view-clinic-bills".to_owned()], Vec::new());
        let catalog = catalog();
        assert!(!catalog.can_use("MARK_BILL_PAID", &grants));

        let grants = AccessGrants::new(vec!["bill".to_owned()], Vec::new());
        assert!(catalog.can_use("MARK_BILL_PAID", &grants));
    }

    #[test]
    fn all_mode_needs_every_token() {
        let catalog = catalog();
        let partial = AccessGrants::new(vec!["edit-patient".to_owned()], Vec::new());
        assert!(!catalog.can_use("MANAGE_PATIENT", &partial));

        let full = AccessGrants::new(
            vec!["edit-patient".to_owned(), "delete-patient".to_owned()],
            Vec::new(),
        );
        assert!(catalog.can_use("MANAGE_PATIENT", &full));
    }

    #[test]
    fn unknown_and_empty_features_are_open() {
        let catalog = catalog();
        assert!(catalog.can_use("NOT_CONFIGURED", &AccessGrants::empty()));
        assert!(catalog.can_use("OPEN", &AccessGrants::empty()));
        assert_eq!(catalog.available_features(&AccessGrants::empty()), vec!["OPEN"]);
    }
}
