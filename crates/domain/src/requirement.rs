use serde::{Deserialize, Serialize};

use crate::security::{AccessGrants, Role};

/// Page-level access requirement attached to navigation items and routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessRequirement {
    /// Nothing declared. Grants access (fail-open).
    #[default]
    None,
    /// Always visible to signed-in users.
    Always,
    /// Role membership OR keyword match.
    Restricted {
        /// Roles that grant access on their own.
        #[serde(default)]
        roles: Vec<Role>,
        /// Keywords matched against permission tokens, any one suffices.
        #[serde(default)]
        keywords: Vec<String>,
    },
}

impl AccessRequirement {
    /// Builds a restricted requirement, collapsing to [`Self::None`] when
    /// both lists are empty.
    #[must_use]
    pub fn restricted<R, K>(roles: R, keywords: K) -> Self
    where
        R: IntoIterator,
        R::Item: Into<Role>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let roles: Vec<Role> = roles.into_iter().map(Into::into).collect();
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        if roles.is_empty() && keywords.is_empty() {
            return Self::None;
        }

        Self::Restricted { roles, keywords }
    }

    /// Keyword-only requirement.
    #[must_use]
    pub fn keywords<K>(keywords: K) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self::restricted(Vec::<Role>::new(), keywords)
    }

    /// Evaluates the requirement.
    ///
    /// Precedence: always, then roles, then keywords. Only a keyword list
    /// that matches nothing denies; unmatched roles alone fall through to a
    /// grant.
    #[must_use]
    pub fn is_satisfied_by(&self, grants: &AccessGrants) -> bool {
        match self {
            Self::None | Self::Always => true,
            Self::Restricted { roles, keywords } => {
                if !roles.is_empty() && grants.has_any_role(roles) {
                    return true;
                }
                keywords.is_empty() || grants.has_any_keyword(keywords)
            }
        }
    }
}

/// Combination mode for multi-token checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Any listed token grants.
    #[default]
    Any,
    /// Every listed token is required.
    All,
}

#[cfg(test)]
mod tests {
    use super::AccessRequirement;
    use crate::security::{AccessGrants, Role};

    fn billing_clerk() -> AccessGrants {
        AccessGrants::new(vec!["view-clinic-bills".to_owned()], vec![Role::Secretary])
    }

    #[test]
    fn empty_restricted_requirement_collapses_to_none() {
        let requirement = AccessRequirement::restricted(Vec::<Role>::new(), Vec::<String>::new());
        assert_eq!(requirement, AccessRequirement::None);
        assert!(requirement.is_satisfied_by(&AccessGrants::empty()));
    }

    #[test]
    fn always_grants_without_permissions() {
        assert!(AccessRequirement::Always.is_satisfied_by(&AccessGrants::empty()));
    }

    #[test]
    fn keywords_grant_on_any_match() {
        let grants = billing_clerk();
        assert!(AccessRequirement::keywords(["bill"]).is_satisfied_by(&grants));
        assert!(!AccessRequirement::keywords(["expense"]).is_satisfied_by(&grants));
    }

    #[test]
    fn roles_grant_before_keywords_are_checked() {
        let requirement =
            AccessRequirement::restricted([Role::SuperAdmin, Role::Secretary], ["expense"]);
        assert!(requirement.is_satisfied_by(&billing_clerk()));
    }

    #[test]
    fn unmatched_roles_fall_back_to_keywords() {
        let requirement =
            AccessRequirement::restricted([Role::SuperAdmin], ["expense", "bill"]);
        assert!(requirement.is_satisfied_by(&billing_clerk()));

        let requirement = AccessRequirement::restricted([Role::SuperAdmin], ["expense"]);
        assert!(!requirement.is_satisfied_by(&billing_clerk()));
    }

    #[test]
    fn role_only_requirement_falls_through_to_grant() {
        let requirement = AccessRequirement::restricted([Role::SuperAdmin], Vec::<String>::new());
        assert!(requirement.is_satisfied_by(&billing_clerk()));
        assert!(requirement.is_satisfied_by(&AccessGrants::empty()));
    }

    #[test]
    fn requirement_serializes_with_kind_tag() {
        let encoded = serde_json::to_value(AccessRequirement::keywords(["case"]));
        assert_eq!(
            encoded.ok(),
            Some(serde_json::json!({"kind": "restricted", "roles": [], "keywords": ["case"]}))
        );
    }
}
