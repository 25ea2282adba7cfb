//! Clinic settings with a short-lived cache backed by durable storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use smartclinic_core::{AppError, AppResult};
use smartclinic_domain::ClinicSettings;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::session_ports::{Clock, KeyValueStore, SettingsApi};
use crate::session_service::SessionContext;

/// Durable-storage key of the cached settings.
pub const CLINIC_SETTINGS_KEY: &str = "clinic_settings";
/// Durable-storage key of the cache timestamp, in epoch millis.
pub const CLINIC_SETTINGS_TIMESTAMP_KEY: &str = "clinic_settings_timestamp";
/// How long fetched settings are served without refetching.
pub const CLINIC_SETTINGS_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Default)]
struct SettingsState {
    settings: Option<ClinicSettings>,
    fetched_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Clinic settings loader shared by the whole front end.
pub struct ClinicSettingsService {
    settings_api: Arc<dyn SettingsApi>,
    session: Arc<SessionContext>,
    durable_storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<SettingsState>,
}

impl ClinicSettingsService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(
        settings_api: Arc<dyn SettingsApi>,
        session: Arc<SessionContext>,
        durable_storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings_api,
            session,
            durable_storage,
            clock,
            state: RwLock::new(SettingsState::default()),
        }
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        let age = self.clock.now().signed_duration_since(fetched_at);
        age.to_std().is_ok_and(|age| age < CLINIC_SETTINGS_TTL)
    }

    /// Adopts the persisted copy when it is still fresh. Returns whether it
    /// was adopted.
    pub async fn init_from_cache(&self) -> AppResult<bool> {
        if self.state.read().await.settings.is_some() {
            return Ok(true);
        }

        let Some(fetched_at) = self.persisted_timestamp().await? else {
            return Ok(false);
        };
        if !self.is_fresh(fetched_at) {
            debug!(%fetched_at, "persisted clinic settings are stale");
            return Ok(false);
        }
        let Some(settings) = self.persisted_settings().await? else {
            return Ok(false);
        };

        let mut state = self.state.write().await;
        state.settings = Some(settings);
        state.fetched_at = Some(fetched_at);
        Ok(true)
    }

    /// Returns the settings, fetching them when the cache is empty, stale or
    /// `force` is set.
    ///
    /// Fetch failures are logged and recorded in [`Self::last_error`]; the
    /// persisted copy is used regardless of its age.
    pub async fn load(&self, force: bool) -> Option<ClinicSettings> {
        if !force {
            let state = self.state.read().await;
            if let (Some(settings), Some(fetched_at)) = (&state.settings, state.fetched_at)
                && self.is_fresh(fetched_at)
            {
                return Some(settings.clone());
            }
        }

        self.state.write().await.last_error = None;

        match self.fetch().await {
            Ok(settings) => {
                let now = self.clock.now();
                self.persist(&settings, now).await;
                let mut state = self.state.write().await;
                state.settings = Some(settings.clone());
                state.fetched_at = Some(now);
                Some(settings)
            }
            Err(error) => {
                warn!(error = %error, "failed to load clinic settings");
                let fallback = match self.persisted_settings().await {
                    Ok(fallback) => fallback,
                    Err(read_error) => {
                        warn!(error = %read_error, "failed to read cached clinic settings");
                        None
                    }
                };

                let mut state = self.state.write().await;
                state.last_error = Some(error.to_string());
                if fallback.is_some() {
                    state.settings = fallback;
                }
                state.settings.clone()
            }
        }
    }

    async fn fetch(&self) -> AppResult<ClinicSettings> {
        let access_token = self
            .session
            .access_token()
            .ok_or_else(|| AppError::Unauthorized("no active session".to_owned()))?;

        self.settings_api
            .fetch_clinic_settings(access_token.as_str())
            .await
    }

    /// Returns the loaded settings without fetching.
    pub async fn settings(&self) -> Option<ClinicSettings> {
        self.state.read().await.settings.clone()
    }

    /// Message of the last failed load, if the latest load failed.
    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Returns one raw setting value.
    pub async fn setting(&self, category: &str, key: &str) -> Option<Value> {
        self.state
            .read()
            .await
            .settings
            .as_ref()
            .and_then(|settings| settings.setting(category, key).cloned())
    }

    /// Returns one category flattened to `key -> value`.
    pub async fn category_settings(&self, category: &str) -> Map<String, Value> {
        self.state
            .read()
            .await
            .settings
            .as_ref()
            .map(|settings| settings.category_settings(category))
            .unwrap_or_default()
    }

    /// Drops the memory copy and the persisted copy.
    pub async fn clear_cache(&self) {
        {
            let mut state = self.state.write().await;
            state.settings = None;
            state.fetched_at = None;
        }

        for key in [CLINIC_SETTINGS_KEY, CLINIC_SETTINGS_TIMESTAMP_KEY] {
            if let Err(error) = self.durable_storage.remove(key).await {
                warn!(key, error = %error, "failed to clear cached clinic settings");
            }
        }
    }

    /// Clears the cache and fetches fresh settings.
    pub async fn reset_cache(&self) -> Option<ClinicSettings> {
        self.clear_cache().await;
        self.load(true).await
    }

    async fn persisted_timestamp(&self) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .durable_storage
            .get(CLINIC_SETTINGS_TIMESTAMP_KEY)
            .await?
            .and_then(|value| value.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis))
    }

    async fn persisted_settings(&self) -> AppResult<Option<ClinicSettings>> {
        let Some(encoded) = self.durable_storage.get(CLINIC_SETTINGS_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(encoded.as_str()) {
            Ok(settings) => Ok(Some(settings)),
            Err(error) => {
                warn!(error = %error, "ignoring unreadable cached clinic settings");
                Ok(None)
            }
        }
    }

    async fn persist(&self, settings: &ClinicSettings, fetched_at: DateTime<Utc>) {
        let encoded = match serde_json::to_string(settings) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(error = %error, "failed to encode clinic settings");
                return;
            }
        };

        let writes = [
            (CLINIC_SETTINGS_KEY, encoded),
            (
                CLINIC_SETTINGS_TIMESTAMP_KEY,
                fetched_at.timestamp_millis().to_string(),
            ),
        ];
        for (key, value) in writes {
            if let Err(error) = self.durable_storage.set(key, value).await {
                warn!(key, error = %error, "failed to cache clinic settings");
            }
        }
    }
}

#[cfg(test)]
mod tests;
