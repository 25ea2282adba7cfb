use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartclinic_core::{AppError, AppResult, UserIdentity};
use smartclinic_domain::{AccessGrants, ClinicSettings, Role};
use tokio::sync::{Mutex, Notify};

use crate::session_ports::{
    AuthApi, AuthenticatedSession, Clock, KeyValueStore, LoginCredentials, SettingsApi,
    UserProfile,
};

pub(crate) fn grants(permissions: &[&str], roles: &[Role]) -> AccessGrants {
    AccessGrants::new(
        permissions.iter().map(|value| (*value).to_owned()).collect(),
        roles.to_vec(),
    )
}

pub(crate) fn identity() -> UserIdentity {
    UserIdentity::new(
        "7",
        "Dr. Sara",
        Some("sara@clinic.test".to_owned()),
        Some("3".to_owned()),
    )
}

pub(crate) struct FakeAuthApi {
    pub login_grants: Mutex<AccessGrants>,
    pub permission_responses: Mutex<Vec<AppResult<AccessGrants>>>,
    pub current_user_grants: Mutex<AccessGrants>,
    pub hold_permissions: bool,
    pub release: Notify,
    pub permission_calls: AtomicUsize,
    pub current_user_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl FakeAuthApi {
    pub(crate) fn new(login_grants: AccessGrants) -> Self {
        Self {
            current_user_grants: Mutex::new(login_grants.clone()),
            login_grants: Mutex::new(login_grants),
            permission_responses: Mutex::new(Vec::new()),
            hold_permissions: false,
            release: Notify::new(),
            permission_calls: AtomicUsize::new(0),
            current_user_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn holding(mut self) -> Self {
        self.hold_permissions = true;
        self
    }

    pub(crate) async fn queue_permissions(&self, response: AppResult<AccessGrants>) {
        self.permission_responses.lock().await.push(response);
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, credentials: &LoginCredentials) -> AppResult<AuthenticatedSession> {
        if credentials.password != "secret" {
            return Err(AppError::Unauthorized("invalid credentials".to_owned()));
        }

        Ok(AuthenticatedSession {
            access_token: "token-1".to_owned(),
            profile: UserProfile {
                identity: identity(),
                grants: self.login_grants.lock().await.clone(),
            },
        })
    }

    async fn current_user(&self, _access_token: &str) -> AppResult<UserProfile> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserProfile {
            identity: identity(),
            grants: self.current_user_grants.lock().await.clone(),
        })
    }

    async fn fetch_permissions(&self, _access_token: &str) -> AppResult<AccessGrants> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_permissions {
            self.release.notified().await;
        }

        let mut responses = self.permission_responses.lock().await;
        if responses.is_empty() {
            return Ok(self.login_grants.lock().await.clone());
        }
        responses.remove(0)
    }

    async fn logout(&self, _access_token: &str) -> AppResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Unavailable("backend offline".to_owned()))
    }
}

#[derive(Default)]
pub(crate) struct FakeSettingsApi {
    pub responses: Mutex<Vec<AppResult<ClinicSettings>>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SettingsApi for FakeSettingsApi {
    async fn fetch_clinic_settings(&self, _access_token: &str) -> AppResult<ClinicSettings> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(AppError::Unavailable("no response queued".to_owned()));
        }
        responses.remove(0)
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for FakeStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.values.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

pub(crate) struct FakeClock {
    millis: AtomicI64,
}

impl FakeClock {
    pub(crate) fn at(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub(crate) fn advance_seconds(&self, seconds: i64) {
        self.millis.fetch_add(seconds * 1_000, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or_else(|| unreachable!())
    }
}
