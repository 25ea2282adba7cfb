use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;
use smartclinic_core::AppError;
use smartclinic_domain::{ClinicSettings, SettingEntry};

use crate::session_ports::{KeyValueStore, LoginCredentials};
use crate::session_service::SessionContext;
use crate::test_support::{FakeAuthApi, FakeClock, FakeSettingsApi, FakeStore, grants};

use super::{CLINIC_SETTINGS_KEY, CLINIC_SETTINGS_TIMESTAMP_KEY, ClinicSettingsService};

const NOW_MILLIS: i64 = 1_760_000_000_000;

struct Harness {
    api: Arc<FakeSettingsApi>,
    durable: Arc<FakeStore>,
    clock: Arc<FakeClock>,
    service: ClinicSettingsService,
}

async fn harness() -> Harness {
    let clock = Arc::new(FakeClock::at(NOW_MILLIS));
    let session = Arc::new(SessionContext::new(
        Arc::new(FakeAuthApi::new(grants(&["view-clinic-settings"], &[]))),
        Arc::new(FakeStore::default()),
        clock.clone(),
    ));
    session
        .login(&LoginCredentials::new("sara@clinic.test", "secret"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let api = Arc::new(FakeSettingsApi::default());
    let durable = Arc::new(FakeStore::default());
    let service =
        ClinicSettingsService::new(api.clone(), session, durable.clone(), clock.clone());

    Harness {
        api,
        durable,
        clock,
        service,
    }
}

fn clinic(name: &str) -> ClinicSettings {
    ClinicSettings::new([(
        "general",
        vec![SettingEntry {
            setting_key: "clinic_name".to_owned(),
            setting_value: json!(name),
            setting_type: Some("string".to_owned()),
            description: None,
        }],
    )])
}

impl Harness {
    async fn respond(&self, response: Result<ClinicSettings, AppError>) {
        self.api.responses.lock().await.push(response);
    }

    fn calls(&self) -> usize {
        self.api.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn fresh_settings_are_served_from_memory() {
    let harness = harness().await;
    harness.respond(Ok(clinic("Smile Dental"))).await;

    let first = harness.service.load(false).await;
    harness.clock.advance_seconds(299);
    let second = harness.service.load(false).await;

    assert_eq!(first, second);
    assert_eq!(harness.calls(), 1);
    assert_eq!(
        harness.service.setting("general", "clinic_name").await,
        Some(json!("Smile Dental"))
    );
}

#[tokio::test]
async fn stale_or_forced_loads_refetch() {
    let harness = harness().await;
    harness.respond(Ok(clinic("Smile Dental"))).await;
    harness.respond(Ok(clinic("Bright Smile"))).await;
    harness.respond(Ok(clinic("Pearl Clinic"))).await;

    harness.service.load(false).await;
    harness.clock.advance_seconds(301);
    let stale = harness.service.load(false).await;
    let forced = harness.service.load(true).await;

    assert_eq!(stale.map(|settings| settings.clinic_name()), Some("Bright Smile".to_owned()));
    assert_eq!(forced.map(|settings| settings.clinic_name()), Some("Pearl Clinic".to_owned()));
    assert_eq!(harness.calls(), 3);
}

#[tokio::test]
async fn successful_loads_are_persisted() {
    let harness = harness().await;
    harness.respond(Ok(clinic("Smile Dental"))).await;

    harness.service.load(false).await;

    let values = harness.durable.values.lock().await;
    assert_eq!(
        values.get(CLINIC_SETTINGS_TIMESTAMP_KEY).map(String::as_str),
        Some(NOW_MILLIS.to_string().as_str())
    );
    assert!(
        values
            .get(CLINIC_SETTINGS_KEY)
            .is_some_and(|encoded| encoded.contains("Smile Dental"))
    );
}

#[tokio::test]
async fn failures_fall_back_to_the_persisted_copy_regardless_of_age() {
    let harness = harness().await;
    harness
        .durable
        .set(
            CLINIC_SETTINGS_KEY,
            serde_json::to_string(&clinic("Offline Copy")).unwrap_or_default(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .durable
        .set(CLINIC_SETTINGS_TIMESTAMP_KEY, "1".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .respond(Err(AppError::Unavailable("timeout".to_owned())))
        .await;

    let loaded = harness.service.load(false).await;

    assert_eq!(
        loaded.map(|settings| settings.clinic_name()),
        Some("Offline Copy".to_owned())
    );
    assert!(harness.service.last_error().await.is_some());
}

#[tokio::test]
async fn failures_without_any_copy_yield_nothing() {
    let harness = harness().await;
    harness
        .respond(Err(AppError::Unavailable("timeout".to_owned())))
        .await;

    assert_eq!(harness.service.load(false).await, None);
    assert!(harness.service.category_settings("general").await.is_empty());
}

#[tokio::test]
async fn init_from_cache_only_adopts_fresh_copies() {
    let harness = harness().await;
    harness
        .durable
        .set(
            CLINIC_SETTINGS_KEY,
            serde_json::to_string(&clinic("Cached")).unwrap_or_default(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .durable
        .set(
            CLINIC_SETTINGS_TIMESTAMP_KEY,
            (NOW_MILLIS - 10 * 60 * 1_000).to_string(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let stale = harness
        .service
        .init_from_cache()
        .await
        .unwrap_or_else(|_| unreachable!());

    harness
        .durable
        .set(
            CLINIC_SETTINGS_TIMESTAMP_KEY,
            (NOW_MILLIS - 60 * 1_000).to_string(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let fresh = harness
        .service
        .init_from_cache()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(!stale);
    assert!(fresh);
    assert_eq!(
        harness.service.load(false).await.map(|settings| settings.clinic_name()),
        Some("Cached".to_owned())
    );
    assert_eq!(harness.calls(), 0);
}

#[tokio::test]
async fn reset_cache_clears_storage_and_refetches() {
    let harness = harness().await;
    harness.respond(Ok(clinic("Before"))).await;
    harness.respond(Ok(clinic("After"))).await;
    harness.service.load(false).await;

    let reloaded = harness.service.reset_cache().await;

    assert_eq!(
        reloaded.map(|settings| settings.clinic_name()),
        Some("After".to_owned())
    );
    assert_eq!(harness.calls(), 2);

    harness.service.clear_cache().await;
    assert!(harness.durable.values.lock().await.is_empty());
    assert_eq!(harness.service.settings().await, None);
}
