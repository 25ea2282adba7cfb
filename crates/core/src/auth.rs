use serde::{Deserialize, Serialize};

/// User information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: String,
    display_name: String,
    email: Option<String>,
    clinic_id: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from backend account data.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        clinic_id: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email,
            clinic_id,
        }
    }

    /// Returns the backend account identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the backend returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the clinic the account belongs to. Super admins have none.
    #[must_use]
    pub fn clinic_id(&self) -> Option<&str> {
        self.clinic_id.as_deref()
    }
}
