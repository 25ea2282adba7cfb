use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse-grained role issued by the backend.
///
/// The four clinic roles are known by name; anything else the backend sends
/// is kept verbatim so membership tests still work against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Full access to every clinic.
    SuperAdmin,
    /// Manages one clinic and sees all of its records.
    ClinicSuperDoctor,
    /// Sees clinic patients but only their own cases and bills.
    Doctor,
    /// Manages patients and reservations.
    Secretary,
    /// Role value not known to this client.
    Other(String),
}

impl Role {
    /// Returns the stable transport value for this role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::ClinicSuperDoctor => "clinic_super_doctor",
            Self::Doctor => "doctor",
            Self::Secretary => "secretary",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns whether the role is one of the four clinic roles.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "super_admin" => Self::SuperAdmin,
            "clinic_super_doctor" => Self::ClinicSuperDoctor,
            "doctor" => Self::Doctor,
            "secretary" => Self::Secretary,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match Self::from_str(value.as_str()) {
            Ok(Self::Other(_)) | Err(_) => Self::Other(value),
            Ok(known) => known,
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Other(value) => value,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Permission tokens and roles currently held by a session.
///
/// Tokens are opaque `"<action>-<resource>"` strings issued by the backend.
/// The list is only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrants {
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    roles: Vec<Role>,
}

impl AccessGrants {
    /// Creates grants from backend-issued permission and role lists.
    #[must_use]
    pub fn new(permissions: Vec<String>, roles: Vec<Role>) -> Self {
        Self { permissions, roles }
    }

    /// Grants held by an anonymous or logged-out session.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the permission tokens in backend order.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Returns the roles in backend order.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Returns whether no permission and no role is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }

    /// Case-sensitive exact token membership.
    #[must_use]
    pub fn has_exact(&self, token: &str) -> bool {
        self.permissions.iter().any(|permission| permission == token)
    }

    /// Returns true when any token is held. An empty list grants.
    #[must_use]
    pub fn has_any_exact<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens.is_empty() || tokens.iter().any(|token| self.has_exact(token.as_ref()))
    }

    /// Returns true when every token is held. An empty list grants.
    #[must_use]
    pub fn has_all_exact<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens.iter().all(|token| self.has_exact(token.as_ref()))
    }

    /// Returns true when any held token contains `keyword`, ignoring case.
    ///
    /// The match is an unanchored substring search: `"bill"` matches
    /// `"mark-bill-paid"`, and an empty keyword matches any held token.
    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.permissions
            .iter()
            .any(|permission| permission.to_lowercase().contains(keyword.as_str()))
    }

    /// Returns true when any keyword matches. An empty list grants.
    #[must_use]
    pub fn has_any_keyword<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.is_empty()
            || keywords
                .iter()
                .any(|keyword| self.has_keyword(keyword.as_ref()))
    }

    /// Returns true when every keyword matches. An empty list grants.
    #[must_use]
    pub fn has_all_keyword<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords
            .iter()
            .all(|keyword| self.has_keyword(keyword.as_ref()))
    }

    /// Role membership.
    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Returns true when any role is held. An empty list is **denied**, so
    /// "no role required" must be expressed by omitting the role list.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Groups tokens by resource, taken as the last `-` separated segment.
    ///
    /// `create-patient` and `view-clinic-patient` both land under `patient`.
    #[must_use]
    pub fn permissions_by_category(&self) -> BTreeMap<String, Vec<String>> {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for permission in &self.permissions {
            let category = permission
                .rsplit('-')
                .next()
                .unwrap_or(permission.as_str())
                .to_owned();
            categories
                .entry(category)
                .or_default()
                .push(permission.clone());
        }

        categories
    }
}

/// Difference between two permission lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDiff {
    /// Tokens present only in the newer list.
    pub added: Vec<String>,
    /// Tokens present only in the older list.
    pub removed: Vec<String>,
    /// Tokens present in both lists, in newer-list order.
    pub unchanged: Vec<String>,
}

impl PermissionDiff {
    /// Returns whether anything was added or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Compares two permission lists.
#[must_use]
pub fn compare_permissions(old: &[String], new: &[String]) -> PermissionDiff {
    PermissionDiff {
        added: new
            .iter()
            .filter(|permission| !old.contains(permission))
            .cloned()
            .collect(),
        removed: old
            .iter()
            .filter(|permission| !new.contains(permission))
            .cloned()
            .collect(),
        unchanged: new
            .iter()
            .filter(|permission| old.contains(permission))
            .cloned()
            .collect(),
    }
}
