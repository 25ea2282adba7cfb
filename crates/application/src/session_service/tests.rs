use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use smartclinic_core::AppError;
use smartclinic_domain::Role;

use crate::session_ports::{KeyValueStore, LoginCredentials};
use crate::test_support::{FakeAuthApi, FakeClock, FakeStore, grants, identity};

use super::{LAST_PERMISSION_REFRESH_KEY, SESSION_STORAGE_KEY, SessionContext};

const NOW_MILLIS: i64 = 1_760_000_000_000;

fn context(api: Arc<FakeAuthApi>, store: Arc<FakeStore>, clock: Arc<FakeClock>) -> SessionContext {
    SessionContext::new(api, store, clock)
}

fn credentials() -> LoginCredentials {
    LoginCredentials::new("sara@clinic.test", "secret")
}

#[tokio::test]
async fn login_replaces_state_and_persists_session() {
    let api = Arc::new(FakeAuthApi::new(grants(
        &["view-clinic-bills"],
        &[Role::Doctor],
    )));
    let store = Arc::new(FakeStore::default());
    let session = context(api, store.clone(), Arc::new(FakeClock::at(NOW_MILLIS)));

    let user = session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(user, identity());
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some("token-1"));
    assert!(session.check(|grants| grants.has_keyword("bill")));
    assert!(session.check(|grants| grants.has_role(&Role::Doctor)));

    let values = store.values.lock().await;
    assert!(values.contains_key(SESSION_STORAGE_KEY));
    assert_eq!(
        values.get(LAST_PERMISSION_REFRESH_KEY).map(String::as_str),
        Some(NOW_MILLIS.to_string().as_str())
    );
}

#[tokio::test]
async fn failed_login_leaves_session_signed_out() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let session = context(
        api,
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );

    let result = session
        .login(&LoginCredentials::new("sara@clinic.test", "wrong"))
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert!(!session.is_authenticated());
    assert!(session.grants().is_empty());
}

#[tokio::test]
async fn restore_reloads_a_persisted_session_into_a_fresh_context() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let store = Arc::new(FakeStore::default());
    let clock = Arc::new(FakeClock::at(NOW_MILLIS));
    let first = context(api.clone(), store.clone(), clock.clone());
    first
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());

    let second = context(api, store, clock);
    let restored = second.restore().await.unwrap_or_else(|_| unreachable!());

    assert!(restored);
    assert_eq!(second.snapshot().user, Some(identity()));
    assert!(second.check(|grants| grants.has_exact("create-patient")));
}

#[tokio::test]
async fn restore_discards_unreadable_session() {
    let store = Arc::new(FakeStore::default());
    store
        .set(SESSION_STORAGE_KEY, "{not json".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());
    let session = context(
        Arc::new(FakeAuthApi::new(grants(&[], &[]))),
        store.clone(),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );

    let restored = session.restore().await.unwrap_or_else(|_| unreachable!());

    assert!(!restored);
    assert!(!session.is_authenticated());
    assert!(store.values.lock().await.get(SESSION_STORAGE_KEY).is_none());
}

#[tokio::test]
async fn ensure_user_loaded_fetches_only_when_missing() {
    let api = Arc::new(FakeAuthApi::new(grants(&["view-clinic-cases"], &[])));
    let store = Arc::new(FakeStore::default());
    store
        .set(
            SESSION_STORAGE_KEY,
            r#"{"access_token":"token-9","user":null,"grants":{"permissions":[],"roles":[]}}"#
                .to_owned(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let session = context(api.clone(), store, Arc::new(FakeClock::at(NOW_MILLIS)));
    session.restore().await.unwrap_or_else(|_| unreachable!());

    session
        .ensure_user_loaded()
        .await
        .unwrap_or_else(|_| unreachable!());
    session
        .ensure_user_loaded()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(api.current_user_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.snapshot().user, Some(identity()));
    assert!(session.check(|grants| grants.has_keyword("case")));
}

#[tokio::test]
async fn refresh_without_session_is_unauthorized() {
    let api = Arc::new(FakeAuthApi::new(grants(&[], &[])));
    let session = context(
        api.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );

    let result = session.refresh_permissions().await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(api.permission_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refresh_replaces_permissions_wholesale() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let session = context(
        api.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());
    api.queue_permissions(Ok(grants(&["view-clinic-expenses"], &[])))
        .await;

    let refreshed = session
        .refresh_permissions()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(refreshed.permissions(), ["view-clinic-expenses".to_owned()]);
    assert!(!session.check(|grants| grants.has_exact("create-patient")));
}

#[tokio::test]
async fn failed_refresh_keeps_last_snapshot_and_flags_it() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let session = context(
        api.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());
    api.queue_permissions(Err(AppError::Unavailable("timeout".to_owned())))
        .await;

    let result = session.refresh_permissions().await;

    assert!(matches!(result, Err(AppError::Unavailable(_))));
    let state = session.snapshot();
    assert!(state.refresh_failed);
    assert!(state.grants.has_exact("create-patient"));
}

#[tokio::test]
async fn concurrent_refreshes_share_one_request() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])).holding());
    let session = context(
        api.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());
    api.queue_permissions(Ok(grants(&["view-clinic-bills"], &[])))
        .await;

    let (first, second, ()) = tokio::join!(
        session.refresh_permissions(),
        session.refresh_permissions(),
        async { api.release.notify_one() },
    );

    assert_eq!(api.permission_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert!(session.check(|grants| grants.has_keyword("bill")));
}

#[tokio::test]
async fn logout_discards_an_in_flight_refresh() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])).holding());
    let session = context(
        api.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());
    api.queue_permissions(Ok(grants(&["view-clinic-bills"], &[Role::SuperAdmin])))
        .await;

    let (refreshed, ()) = tokio::join!(session.refresh_permissions(), async {
        session.logout().await;
        api.release.notify_one();
    });

    assert!(refreshed.unwrap_or_else(|_| unreachable!()).is_empty());
    assert!(!session.is_authenticated());
    assert!(session.grants().is_empty());
    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_clears_session_storage_even_when_backend_fails() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let store = Arc::new(FakeStore::default());
    let session = context(api, store.clone(), Arc::new(FakeClock::at(NOW_MILLIS)));
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());

    session.logout().await;

    assert!(store.values.lock().await.is_empty());
    assert_eq!(session.snapshot().user, None);
}

#[tokio::test]
async fn refresh_if_stale_waits_for_the_interval() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let clock = Arc::new(FakeClock::at(NOW_MILLIS));
    let session = context(api.clone(), Arc::new(FakeStore::default()), clock.clone())
        .with_refresh_interval(Duration::from_secs(120));
    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());

    clock.advance_seconds(60);
    let early = session
        .refresh_if_stale()
        .await
        .unwrap_or_else(|_| unreachable!());
    clock.advance_seconds(61);
    let late = session
        .refresh_if_stale()
        .await
        .unwrap_or_else(|_| unreachable!());
    let again = session
        .refresh_if_stale()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(!early);
    assert!(late);
    assert!(!again);
    assert_eq!(api.permission_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subscribers_observe_login_and_logout() {
    let api = Arc::new(FakeAuthApi::new(grants(&["create-patient"], &[])));
    let session = context(
        api,
        Arc::new(FakeStore::default()),
        Arc::new(FakeClock::at(NOW_MILLIS)),
    );
    let mut receiver = session.subscribe();

    session
        .login(&credentials())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(receiver.has_changed().unwrap_or(false));
    assert!(receiver.borrow_and_update().is_authenticated());

    session.logout().await;
    assert!(!receiver.borrow_and_update().is_authenticated());
}
