//! Application services and ports.

#![forbid(unsafe_code)]

mod clinic_settings_service;
mod dashboard_preferences;
mod navigation_service;
mod route_guard;
mod session_ports;
mod session_service;
mod visibility_service;

#[cfg(test)]
mod test_support;

pub use clinic_settings_service::{
    CLINIC_SETTINGS_KEY, CLINIC_SETTINGS_TIMESTAMP_KEY, CLINIC_SETTINGS_TTL,
    ClinicSettingsService,
};
pub use dashboard_preferences::{
    DASHBOARD_DATE_FROM_KEY, DASHBOARD_DATE_TO_KEY, DashboardPreferences,
};
pub use navigation_service::{AccessSummary, NavigationService};
pub use route_guard::{GuardOutcome, NavigationDecision, RouteGuard};
pub use session_ports::{
    AuthApi, AuthenticatedSession, Clock, KeyValueStore, LoginCredentials, SettingsApi,
    UserProfile,
};
pub use session_service::{
    DEFAULT_PERMISSION_REFRESH_INTERVAL, LAST_PERMISSION_REFRESH_KEY, SESSION_STORAGE_KEY,
    SessionContext, SessionState,
};
pub use visibility_service::{BoundVisibility, PermissionChangeWatcher};
