use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartclinic_core::{AppResult, UserIdentity};
use smartclinic_domain::{AccessGrants, ClinicSettings};

/// Login form payload.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates credentials from form input.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Current-user payload: account data plus its grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Account identity.
    pub identity: UserIdentity,
    /// Permissions and roles attached to the account.
    pub grants: AccessGrants,
}

/// Successful login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    /// Bearer token for later calls.
    pub access_token: String,
    /// Signed-in user.
    pub profile: UserProfile,
}

/// Backend port for authentication and permission lookups.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges credentials for a session.
    async fn login(&self, credentials: &LoginCredentials) -> AppResult<AuthenticatedSession>;

    /// Loads the signed-in user.
    async fn current_user(&self, access_token: &str) -> AppResult<UserProfile>;

    /// Loads the current permission and role lists.
    async fn fetch_permissions(&self, access_token: &str) -> AppResult<AccessGrants>;

    /// Invalidates the token on the backend.
    async fn logout(&self, access_token: &str) -> AppResult<()>;
}

/// Backend port for grouped clinic settings.
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Loads all clinic settings grouped by category.
    async fn fetch_clinic_settings(&self, access_token: &str) -> AppResult<ClinicSettings>;
}

/// String key-value storage, either tab-scoped or durable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Writes a value.
    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    /// Removes a value. Missing keys are not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// Wall-clock source.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
