//! SmartClinic access-control console.
//!
//! Signs in with the configured account and prints what the front end would
//! show that user: navigation, route decisions, feature gates or clinic
//! settings.

#![forbid(unsafe_code)]

mod console_config;

use std::sync::Arc;

use console_config::{ConsoleConfig, Report, init_tracing};
use serde::Serialize;
use serde_json::{Value, json};
use smartclinic_application::{
    ClinicSettingsService, DashboardPreferences, LoginCredentials, NavigationDecision,
    NavigationService, RouteGuard, SessionContext,
};
use smartclinic_core::{AppError, AppResult};
use smartclinic_domain::ClinicCatalog;
use smartclinic_infrastructure::{
    HttpClinicApi, InMemoryKeyValueStore, JsonFileKeyValueStore, SystemClock,
};
use tracing::{info, warn};

struct Console {
    session: Arc<SessionContext>,
    navigation: NavigationService,
    guard: RouteGuard,
    settings: ClinicSettingsService,
    dashboard: DashboardPreferences,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    name: String,
    path: String,
    title: String,
    decision: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ConsoleConfig::load()?;
    info!(
        api_base_url = %config.api_base_url,
        language = config.language.as_str(),
        state_dir = %config.state_dir.display(),
        "smartclinic-console started"
    );

    let console = build_console(&config)?;
    console.session.restore().await?;
    if !console.session.is_authenticated() {
        let credentials = LoginCredentials::new(config.email.clone(), config.password.clone());
        let user = console.session.login(&credentials).await?;
        info!(user_id = %user.user_id(), name = %user.display_name(), "signed in");
    }

    let output = match config.report {
        Report::Navigation => console.navigation_report(),
        Report::Routes => console.routes_report().await,
        Report::Features => console.features_report(),
        Report::Settings => console.settings_report().await?,
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");

    console.session.logout().await;
    Ok(())
}

fn build_console(config: &ConsoleConfig) -> AppResult<Console> {
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let api = Arc::new(HttpClinicApi::new(
        http_client,
        config.api_base_url.as_str(),
        config.language.as_str(),
    )?);
    let session_storage = Arc::new(InMemoryKeyValueStore::new());
    let durable_storage = Arc::new(JsonFileKeyValueStore::new(config.durable_store_path()));
    let clock = Arc::new(SystemClock);

    let session = Arc::new(
        SessionContext::new(api.clone(), session_storage, clock.clone())
            .with_refresh_interval(config.permission_refresh_interval),
    );
    let catalog = Arc::new(ClinicCatalog::standard()?);

    Ok(Console {
        navigation: NavigationService::new(session.clone(), catalog.clone(), config.language),
        guard: RouteGuard::new(session.clone(), catalog.routes.clone()),
        settings: ClinicSettingsService::new(
            api,
            session.clone(),
            durable_storage.clone(),
            clock.clone(),
        ),
        dashboard: DashboardPreferences::new(durable_storage, clock.as_ref()),
        session,
    })
}

impl Console {
    fn navigation_report(&self) -> Value {
        json!({
            "navigation": self.navigation.navigation_entries(),
            "bottom_navigation": self.navigation.bottom_navigation_entries(),
            "access": self.navigation.access_summary(),
        })
    }

    async fn routes_report(&self) -> Value {
        let mut routes = Vec::with_capacity(self.guard.routes().routes().len());
        for route in self.guard.routes().routes() {
            let decision = self.guard.authorize(route).await;
            routes.push(RouteReport {
                name: route.name().to_owned(),
                path: route.path().to_owned(),
                title: route.document_title().to_owned(),
                decision: decision_label(&decision),
            });
        }

        json!({ "routes": routes })
    }

    fn features_report(&self) -> Value {
        json!({
            "available": self.navigation.available_features(),
            "refresh_failed": self.session.snapshot().refresh_failed,
        })
    }

    async fn settings_report(&self) -> AppResult<Value> {
        if let Err(error) = self.settings.init_from_cache().await {
            warn!(error = %error, "failed to read cached clinic settings");
        }
        let settings = self.settings.load(false).await.unwrap_or_default();
        let dashboard_range = self.dashboard.load().await?;

        Ok(json!({
            "clinic": {
                "name": settings.clinic_name(),
                "phone": settings.clinic_phone(),
                "email": settings.clinic_email(),
                "address": settings.clinic_address(),
                "website": settings.clinic_website(),
                "logo": settings.clinic_logo(),
                "social": settings.social_links(),
            },
            "appointments": {
                "duration_minutes": settings.appointment_duration(),
                "booking_buffer_minutes": settings.booking_buffer(),
                "max_daily": settings.max_daily_appointments(),
                "online_booking": settings.online_booking_enabled(),
                "working_hours": settings.working_hours(),
            },
            "financial": {
                "currency": settings.currency(),
                "tax_rate": settings.tax_rate(),
            },
            "display": {
                "theme_color": settings.theme_color(),
                "language": settings.language(),
                "date_format": settings.date_format(),
                "time_format": settings.time_format(),
            },
            "notifications": {
                "sms": settings.sms_enabled(),
                "email": settings.email_enabled(),
                "whatsapp": settings.whatsapp_enabled(),
                "reminder_hours": settings.reminder_hours(),
            },
            "dashboard_range": {
                "from": dashboard_range.from_param(),
                "to": dashboard_range.to_param(),
            },
            "load_error": self.settings.last_error().await,
        }))
    }
}

fn decision_label(decision: &NavigationDecision) -> &'static str {
    match decision {
        NavigationDecision::Allow => "allow",
        NavigationDecision::RedirectToLogin => "redirect_to_login",
        NavigationDecision::RedirectToLanding => "redirect_to_landing",
        NavigationDecision::AccessDenied => "access_denied",
        NavigationDecision::RedirectToPath(_) => "redirect",
    }
}
