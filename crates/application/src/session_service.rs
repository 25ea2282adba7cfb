//! Authenticated session state shared by the guard, navigation and bindings.
//!
//! State lives in a `watch` channel so derived values can follow it. Every
//! mutation is tagged with a monotonically increasing sequence number; a
//! backend response is applied only while its sequence is still the newest
//! one issued, so a logout or re-login always wins over an older in-flight
//! refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smartclinic_core::{AppError, AppResult, UserIdentity};
use smartclinic_domain::AccessGrants;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::session_ports::{AuthApi, Clock, KeyValueStore, LoginCredentials, UserProfile};

/// Session-storage key of the last permission refresh, in epoch millis.
pub const LAST_PERMISSION_REFRESH_KEY: &str = "last_permission_refresh";
/// Session-storage key of the persisted session.
pub const SESSION_STORAGE_KEY: &str = "auth_session";
/// Default minimum age of the permission list before navigation refreshes it.
pub const DEFAULT_PERMISSION_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// Snapshot of the authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bearer token; `None` when signed out.
    pub access_token: Option<String>,
    /// Loaded user, if any.
    pub user: Option<UserIdentity>,
    /// Current grants.
    pub grants: AccessGrants,
    /// Set when the last permission refresh failed.
    pub refresh_failed: bool,
    /// Sequence number of the mutation that produced this state.
    pub revision: u64,
}

impl SessionState {
    /// Returns whether a session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    user: Option<UserIdentity>,
    grants: AccessGrants,
}

/// Explicitly constructed session context.
pub struct SessionContext {
    auth_api: Arc<dyn AuthApi>,
    session_storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    refresh_interval: Duration,
    state: watch::Sender<SessionState>,
    issued_sequence: AtomicU64,
    completed_refreshes: AtomicU64,
    refresh_gate: Mutex<Option<AppResult<AccessGrants>>>,
}

impl SessionContext {
    /// Creates a signed-out session.
    #[must_use]
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        session_storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth_api,
            session_storage,
            clock,
            refresh_interval: DEFAULT_PERMISSION_REFRESH_INTERVAL,
            state,
            issued_sequence: AtomicU64::new(0),
            completed_refreshes: AtomicU64::new(0),
            refresh_gate: Mutex::new(None),
        }
    }

    /// Overrides the navigation refresh interval.
    #[must_use]
    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Returns the current grants.
    #[must_use]
    pub fn grants(&self) -> AccessGrants {
        self.state.borrow().grants.clone()
    }

    /// Runs a check against the current grants without cloning them.
    pub fn check<F>(&self, check: F) -> bool
    where
        F: FnOnce(&AccessGrants) -> bool,
    {
        check(&self.state.borrow().grants)
    }

    /// Returns whether a session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Returns the bearer token of the active session.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn next_sequence(&self) -> u64 {
        self.issued_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.issued_sequence.load(Ordering::SeqCst) == sequence
    }

    /// Reloads a session persisted in session storage. Returns whether one
    /// was found.
    pub async fn restore(&self) -> AppResult<bool> {
        let Some(encoded) = self.session_storage.get(SESSION_STORAGE_KEY).await? else {
            return Ok(false);
        };

        let persisted: PersistedSession = match serde_json::from_str(encoded.as_str()) {
            Ok(persisted) => persisted,
            Err(error) => {
                warn!(error = %error, "discarding unreadable persisted session");
                self.session_storage.remove(SESSION_STORAGE_KEY).await?;
                return Ok(false);
            }
        };

        let sequence = self.next_sequence();
        self.state.send_replace(SessionState {
            access_token: Some(persisted.access_token),
            user: persisted.user,
            grants: persisted.grants,
            refresh_failed: false,
            revision: sequence,
        });
        debug!(revision = sequence, "restored persisted session");

        Ok(true)
    }

    /// Signs in and replaces the whole session state.
    pub async fn login(&self, credentials: &LoginCredentials) -> AppResult<UserIdentity> {
        let sequence = self.next_sequence();
        let session = self.auth_api.login(credentials).await?;

        if !self.is_current(sequence) {
            return Err(AppError::Conflict(
                "login was superseded by a newer session change".to_owned(),
            ));
        }

        let identity = session.profile.identity.clone();
        self.state.send_replace(SessionState {
            access_token: Some(session.access_token),
            user: Some(session.profile.identity),
            grants: session.profile.grants,
            refresh_failed: false,
            revision: sequence,
        });
        self.persist().await;
        self.stamp_refresh().await;

        info!(
            user_id = %identity.user_id(),
            permission_count = self.state.borrow().grants.permissions().len(),
            "signed in"
        );

        Ok(identity)
    }

    /// Fetches the current user and its grants.
    pub async fn load_user(&self) -> AppResult<UserIdentity> {
        let access_token = self.require_token()?;
        let sequence = self.next_sequence();
        let UserProfile { identity, grants } =
            self.auth_api.current_user(access_token.as_str()).await?;

        if self.is_current(sequence) {
            self.state.send_modify(|state| {
                state.user = Some(identity.clone());
                state.grants = grants;
                state.revision = sequence;
            });
            self.persist().await;
        } else {
            debug!(sequence, "discarding stale current-user response");
        }

        Ok(identity)
    }

    /// Loads the current user when the session has none yet.
    pub async fn ensure_user_loaded(&self) -> AppResult<()> {
        let missing = {
            let state = self.state.borrow();
            state.is_authenticated() && state.user.is_none()
        };
        if missing {
            self.load_user().await?;
        }

        Ok(())
    }

    /// Replaces the permission list with a fresh copy from the backend.
    ///
    /// Concurrent callers share one in-flight request. On failure the last
    /// snapshot stays in place and `refresh_failed` is set.
    pub async fn refresh_permissions(&self) -> AppResult<AccessGrants> {
        let seen = self.completed_refreshes.load(Ordering::SeqCst);
        let mut gate = self.refresh_gate.lock().await;
        if self.completed_refreshes.load(Ordering::SeqCst) != seen
            && let Some(outcome) = gate.as_ref()
        {
            debug!("joined in-flight permission refresh");
            return outcome.clone();
        }

        let outcome = self.fetch_and_apply_permissions().await;
        *gate = Some(outcome.clone());
        self.completed_refreshes.fetch_add(1, Ordering::SeqCst);

        outcome
    }

    async fn fetch_and_apply_permissions(&self) -> AppResult<AccessGrants> {
        let access_token = self.require_token()?;
        let sequence = self.next_sequence();

        match self.auth_api.fetch_permissions(access_token.as_str()).await {
            Ok(grants) if self.is_current(sequence) => {
                self.state.send_modify(|state| {
                    state.grants = grants.clone();
                    state.refresh_failed = false;
                    state.revision = sequence;
                });
                self.persist().await;
                debug!(
                    revision = sequence,
                    permission_count = grants.permissions().len(),
                    "permissions refreshed"
                );
                Ok(grants)
            }
            Ok(_) => {
                debug!(sequence, "discarding stale permission refresh");
                Ok(self.grants())
            }
            Err(error) => {
                if self.is_current(sequence) {
                    self.state.send_modify(|state| state.refresh_failed = true);
                }
                warn!(error = %error, "permission refresh failed, keeping last snapshot");
                Err(error)
            }
        }
    }

    /// Refreshes permissions when the last refresh is older than the
    /// configured interval. Returns whether a refresh was attempted.
    pub async fn refresh_if_stale(&self) -> AppResult<bool> {
        let now = self.clock.now().timestamp_millis();
        let last_refresh = self
            .session_storage
            .get(LAST_PERMISSION_REFRESH_KEY)
            .await?
            .and_then(|value| value.trim().parse::<i64>().ok());
        let interval = i64::try_from(self.refresh_interval.as_millis()).unwrap_or(i64::MAX);

        let stale = last_refresh.is_none_or(|last| now.saturating_sub(last) > interval);
        if !stale {
            return Ok(false);
        }

        let outcome = self.refresh_permissions().await;
        self.stamp_refresh().await;
        outcome.map(|_| true)
    }

    /// Signs out, clearing state and session storage. Backend failures are
    /// logged only.
    pub async fn logout(&self) {
        let sequence = self.next_sequence();
        let previous = self.state.send_replace(SessionState {
            revision: sequence,
            ..SessionState::default()
        });

        for key in [SESSION_STORAGE_KEY, LAST_PERMISSION_REFRESH_KEY] {
            if let Err(error) = self.session_storage.remove(key).await {
                warn!(key, error = %error, "failed to clear session storage");
            }
        }

        if let Some(access_token) = previous.access_token
            && let Err(error) = self.auth_api.logout(access_token.as_str()).await
        {
            warn!(error = %error, "backend logout failed");
        }

        info!(revision = sequence, "signed out");
    }

    fn require_token(&self) -> AppResult<String> {
        self.access_token()
            .ok_or_else(|| AppError::Unauthorized("no active session".to_owned()))
    }

    async fn persist(&self) {
        let persisted = {
            let state = self.state.borrow();
            let Some(access_token) = state.access_token.clone() else {
                return;
            };
            PersistedSession {
                access_token,
                user: state.user.clone(),
                grants: state.grants.clone(),
            }
        };

        let result = match serde_json::to_string(&persisted) {
            Ok(encoded) => self.session_storage.set(SESSION_STORAGE_KEY, encoded).await,
            Err(error) => Err(AppError::Internal(format!(
                "failed to encode session: {error}"
            ))),
        };
        if let Err(error) = result {
            warn!(error = %error, "failed to persist session");
        }
    }

    async fn stamp_refresh(&self) {
        let now = self.clock.now().timestamp_millis().to_string();
        if let Err(error) = self
            .session_storage
            .set(LAST_PERMISSION_REFRESH_KEY, now)
            .await
        {
            warn!(error = %error, "failed to record permission refresh time");
        }
    }
}

#[cfg(test)]
mod tests;
