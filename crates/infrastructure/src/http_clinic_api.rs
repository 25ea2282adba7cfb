use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smartclinic_application::{
    AuthApi, AuthenticatedSession, LoginCredentials, SettingsApi, UserProfile,
};
use smartclinic_core::{AppError, AppResult, UserIdentity};
use smartclinic_domain::{AccessGrants, ClinicSettings, Role};
use tracing::debug;
use url::Url;

/// REST client for the clinic backend.
pub struct HttpClinicApi {
    http_client: reqwest::Client,
    base_url: Url,
    language: String,
}

impl HttpClinicApi {
    /// Creates a client for `base_url`, e.g. `https://host/api`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        language: impl Into<String>,
    ) -> AppResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(normalized.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid API base URL '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "API base URL '{base_url}' cannot carry paths"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            language: language.into(),
        })
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| AppError::Internal(format!("invalid endpoint '{path}': {error}")))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        access_token: Option<&str>,
    ) -> AppResult<reqwest::RequestBuilder> {
        let builder = self
            .http_client
            .request(method, self.endpoint(path)?)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::ACCEPT_LANGUAGE, self.language.as_str());

        Ok(match access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: reqwest::RequestBuilder, operation: &str) -> AppResult<Value> {
        let response = builder.send().await.map_err(|error| {
            AppError::Unavailable(format!("{operation} request failed: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            AppError::Unavailable(format!("{operation} response could not be read: {error}"))
        })?;
        debug!(operation, status = status.as_u16(), "backend responded");

        let payload: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body.as_str()).map_err(|error| {
                if status.is_success() {
                    AppError::Internal(format!("{operation} returned invalid JSON: {error}"))
                } else {
                    status_error(status, operation, None)
                }
            })?
        };

        if !status.is_success() {
            return Err(status_error(status, operation, backend_message(&payload)));
        }
        if payload.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(AppError::Internal(format!(
                "{operation} was rejected: {}",
                backend_message(&payload).unwrap_or("no message")
            )));
        }

        Ok(payload)
    }
}

#[async_trait]
impl AuthApi for HttpClinicApi {
    async fn login(&self, credentials: &LoginCredentials) -> AppResult<AuthenticatedSession> {
        let builder = self
            .request(reqwest::Method::POST, "auth/login", None)?
            .json(&serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
            }));
        let payload = self.send(builder, "login").await?;

        decode_login(payload)
    }

    async fn current_user(&self, access_token: &str) -> AppResult<UserProfile> {
        let builder = self.request(reqwest::Method::GET, "auth/me", Some(access_token))?;
        let payload = self.send(builder, "current user").await?;

        decode_current_user(payload)
    }

    async fn fetch_permissions(&self, access_token: &str) -> AppResult<AccessGrants> {
        let builder = self.request(reqwest::Method::GET, "auth/permissions", Some(access_token))?;
        let payload = self.send(builder, "permissions").await?;

        decode::<GrantsDto>(unwrap_data(payload), "permissions").map(GrantsDto::into_grants)
    }

    async fn logout(&self, access_token: &str) -> AppResult<()> {
        let builder = self.request(reqwest::Method::POST, "auth/logout", Some(access_token))?;
        self.send(builder, "logout").await.map(|_| ())
    }
}

#[async_trait]
impl SettingsApi for HttpClinicApi {
    async fn fetch_clinic_settings(&self, access_token: &str) -> AppResult<ClinicSettings> {
        let builder = self.request(reqwest::Method::GET, "clinic-settings", Some(access_token))?;
        let payload = self.send(builder, "clinic settings").await?;

        decode(unwrap_data(payload), "clinic settings")
    }
}

fn status_error(status: StatusCode, operation: &str, message: Option<&str>) -> AppError {
    let detail = match message {
        Some(message) => format!("{operation} failed with status {status}: {message}"),
        None => format!("{operation} failed with status {status}"),
    };

    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(detail),
        StatusCode::FORBIDDEN => AppError::Forbidden(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        StatusCode::CONFLICT => AppError::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::Validation(detail)
        }
        status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
            AppError::Unavailable(detail)
        }
        _ => AppError::Internal(detail),
    }
}

fn backend_message(payload: &Value) -> Option<&str> {
    payload
        .get("message")
        .or_else(|| payload.get("error"))
        .and_then(Value::as_str)
}

fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut object) if object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(payload: Value, operation: &str) -> AppResult<T> {
    serde_json::from_value(payload).map_err(|error| {
        AppError::Internal(format!("{operation} response has an unexpected shape: {error}"))
    })
}

/// Permission or role as sent by the backend: a bare name or a named record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedToken {
    Plain(String),
    Named { name: String },
}

impl NamedToken {
    fn into_name(self) -> String {
        match self {
            Self::Plain(name) | Self::Named { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GrantsDto {
    #[serde(default)]
    permissions: Vec<NamedToken>,
    #[serde(default)]
    roles: Vec<NamedToken>,
}

impl GrantsDto {
    fn into_grants(self) -> AccessGrants {
        AccessGrants::new(
            self.permissions
                .into_iter()
                .map(NamedToken::into_name)
                .collect(),
            self.roles
                .into_iter()
                .map(|role| Role::from(role.into_name()))
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    clinic_id: Option<Value>,
    #[serde(flatten)]
    grants: GrantsDto,
}

impl UserDto {
    fn into_profile(self) -> AppResult<UserProfile> {
        let user_id = scalar_text(&self.id)
            .ok_or_else(|| AppError::Internal("user payload has no usable id".to_owned()))?;
        let display_name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| user_id.clone());
        let clinic_id = self.clinic_id.as_ref().and_then(scalar_text);

        Ok(UserProfile {
            identity: UserIdentity::new(user_id, display_name, self.email, clinic_id),
            grants: self.grants.into_grants(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LoginDto {
    #[serde(alias = "access_token")]
    token: String,
    user: UserDto,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn decode_login(payload: Value) -> AppResult<AuthenticatedSession> {
    let login: LoginDto = decode(unwrap_data(payload), "login")?;

    Ok(AuthenticatedSession {
        access_token: login.token,
        profile: login.user.into_profile()?,
    })
}

fn decode_current_user(payload: Value) -> AppResult<UserProfile> {
    let payload = match unwrap_data(payload) {
        Value::Object(mut object) if object.contains_key("user") => {
            object.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };

    decode::<UserDto>(payload, "current user")?.into_profile()
}
