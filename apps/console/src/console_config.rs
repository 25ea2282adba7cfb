use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use smartclinic_core::{AppError, AppResult};
use smartclinic_domain::Language;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_BASE_URL: &str = "https://api.smartclinic.software/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Navigation,
    Routes,
    Features,
    Settings,
}

impl FromStr for Report {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nav" | "navigation" => Ok(Self::Navigation),
            "routes" => Ok(Self::Routes),
            "features" => Ok(Self::Features),
            "settings" => Ok(Self::Settings),
            other => Err(AppError::Validation(format!(
                "unknown report '{other}', expected nav, routes, features or settings"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub email: String,
    pub password: String,
    pub language: Language,
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
    pub permission_refresh_interval: Duration,
    pub report: Report,
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConsoleConfig")
            .field("api_base_url", &self.api_base_url)
            .field("email", &self.email)
            .field("language", &self.language)
            .field("state_dir", &self.state_dir)
            .field("http_timeout", &self.http_timeout)
            .field("permission_refresh_interval", &self.permission_refresh_interval)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl ConsoleConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(env::args().nth(1).as_deref(), |name| env::var(name).ok())
    }

    fn from_lookup<F>(report: Option<&str>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };
        let seconds = |name: &str, default: u64| -> AppResult<Duration> {
            let seconds = match optional(name) {
                Some(value) => value.parse::<u64>().map_err(|error| {
                    AppError::Validation(format!("invalid {name} value '{value}': {error}"))
                })?,
                None => default,
            };
            if seconds == 0 {
                return Err(AppError::Validation(format!(
                    "{name} must be greater than zero"
                )));
            }
            Ok(Duration::from_secs(seconds))
        };

        let api_base_url = optional("SMARTCLINIC_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let email = required("SMARTCLINIC_EMAIL")?;
        let password = required("SMARTCLINIC_PASSWORD")?;
        let language = optional("SMARTCLINIC_LANGUAGE")
            .map(|value| value.parse::<Language>())
            .transpose()?
            .unwrap_or_default();
        let state_dir = PathBuf::from(
            optional("SMARTCLINIC_STATE_DIR").unwrap_or_else(|| ".smartclinic".to_owned()),
        );
        let http_timeout = seconds("SMARTCLINIC_HTTP_TIMEOUT_SECONDS", 15)?;
        let permission_refresh_interval = seconds("SMARTCLINIC_PERMISSION_REFRESH_SECONDS", 120)?;
        let report = report.map(str::parse::<Report>).transpose()?.unwrap_or(Report::Navigation);

        Ok(Self {
            api_base_url,
            email,
            password,
            language,
            state_dir,
            http_timeout,
            permission_refresh_interval,
            report,
        })
    }

    pub fn durable_store_path(&self) -> PathBuf {
        self.state_dir.join("local_storage.json")
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
