//! Provider backed by a hosted HTTP backend.
//!
//! Speaks the Supabase dialect: GoTrue-style auth endpoints under
//! `auth/v1/` and a PostgREST `profiles` table under `rest/v1/`. The
//! session token lives in process memory only; restarting the process
//! starts signed out.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use url::Url;

use super::{
    AuthIdentity, IdentityProvider, ProfilePatch, ProfileRow, ProfileStore, ProviderError,
    ProviderSession, SessionChange, SessionEventKind, SessionEvents, Subscribers,
};
use crate::Result;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a [`RestProvider`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the backend, e.g. `https://xyz.supabase.co`.
    pub base_url: Url,

    /// Project API key, sent as the `apikey` header on every request.
    pub api_key: String,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// HTTP [`IdentityProvider`] + [`ProfileStore`].
pub struct RestProvider {
    config: RestConfig,
    client: reqwest::Client,
    session: Mutex<Option<ProviderSession>>,
    subscribers: Subscribers,
}

/// GoTrue auth response, shared by signup and password grant.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    display_name: Option<String>,
}

impl RestProvider {
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable {
                reason: format!("http client init failed: {e}"),
            })?;
        Ok(Self {
            config,
            client,
            session: Mutex::new(None),
            subscribers: Subscribers::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    /// Bearer token for REST calls: the session token when signed in, the
    /// project key otherwise.
    fn bearer(&self) -> String {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.api_key.clone())
    }

    fn install_session(&self, response: AuthResponse) -> ProviderSession {
        let session = ProviderSession {
            identity: AuthIdentity {
                id: response.user.id,
                email: response.user.email,
                display_name: response.user.user_metadata.display_name,
            },
            access_token: response.access_token,
        };
        *self.session.lock().unwrap() = Some(session.clone());
        session
    }

    async fn auth_request(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        self.client
            .post(self.endpoint(path))
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                reason: e.to_string(),
            })
    }

    async fn parse_auth_response(response: reqwest::Response) -> Result<AuthResponse> {
        response
            .json::<AuthResponse>()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse {
                    reason: format!("malformed auth response: {e}"),
                }
                .into()
            })
    }
}

#[async_trait]
impl IdentityProvider for RestProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<ProviderSession> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        });
        let response = self.auth_request("auth/v1/signup", body).await?;
        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            if status == StatusCode::CONFLICT
                || message.to_ascii_lowercase().contains("already registered")
            {
                return Err(ProviderError::EmailTaken {
                    email: email.to_string(),
                }
                .into());
            }
            return Err(auth_failure(status, message).into());
        }
        let session = self.install_session(Self::parse_auth_response(response).await?);
        self.subscribers.emit(SessionChange {
            event: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession> {
        let body = json!({ "email": email, "password": password });
        let response = self
            .auth_request("auth/v1/token?grant_type=password", body)
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(auth_failure(status, message).into());
        }
        let session = self.install_session(Self::parse_auth_response(response).await?);
        self.subscribers.emit(SessionChange {
            event: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn end_session(&self) -> Result<()> {
        // Drop the local session first so the caller is signed out even if
        // the revocation call fails; the server token then just expires.
        let ended = self.session.lock().unwrap().take();
        let Some(session) = ended else {
            return Ok(());
        };
        let result = self
            .client
            .post(self.endpoint("auth/v1/logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "session revocation rejected");
            }
            Err(e) => warn!(error = %e, "session revocation failed"),
            Ok(_) => {}
        }
        self.subscribers.emit(SessionChange {
            event: SessionEventKind::SignedOut,
            session: None,
        });
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<ProviderSession>> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> SessionEvents {
        self.subscribers.subscribe()
    }
}

#[async_trait]
impl ProfileStore for RestProvider {
    async fn read_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        let filter = format!("eq.{id}");
        let response = self
            .client
            .get(self.endpoint("rest/v1/profiles"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
            .query(&[("id", filter.as_str()), ("select", "*")])
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(rest_failure(status, message).into());
        }
        let mut rows: Vec<ProfileRow> =
            response.json().await.map_err(|e| ProviderError::InvalidResponse {
                reason: format!("malformed profile rows: {e}"),
            })?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn insert_profile(&self, row: &ProfileRow) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("rest/v1/profiles"))
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer())
            .json(row)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(ProviderError::ProfileExists { id: row.id.clone() }.into());
        }
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(rest_failure(status, message).into());
        }
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<ProfileRow> {
        let filter = format!("eq.{id}");
        let response = self
            .client
            .patch(self.endpoint("rest/v1/profiles"))
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .query(&[("id", filter.as_str())])
            .json(&patch_body(patch))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(rest_failure(status, message).into());
        }
        let mut rows: Vec<ProfileRow> =
            response.json().await.map_err(|e| ProviderError::InvalidResponse {
                reason: format!("malformed profile rows: {e}"),
            })?;
        if rows.is_empty() {
            // PostgREST answers an unmatched filter with an empty set.
            return Err(ProviderError::ProfileMissing { id: id.to_string() }.into());
        }
        Ok(rows.swap_remove(0))
    }
}

/// JSON body for a PATCH against the profiles table. Only fields the patch
/// names are present; a cleared avatar is sent as an explicit `null`.
fn patch_body(patch: &ProfilePatch) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    if let Some(name) = &patch.name {
        body.insert("name".to_string(), json!(name));
    }
    if let Some(avatar) = &patch.avatar_url {
        body.insert("avatar_url".to_string(), json!(avatar));
    }
    serde_json::Value::Object(body)
}

fn auth_failure(status: StatusCode, message: String) -> ProviderError {
    if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::UNPROCESSABLE_ENTITY
    {
        ProviderError::InvalidCredentials
    } else {
        rest_failure(status, message)
    }
}

fn rest_failure(status: StatusCode, message: String) -> ProviderError {
    if status.is_server_error() {
        ProviderError::Unavailable {
            reason: format!("{status}: {message}"),
        }
    } else {
        ProviderError::InvalidResponse {
            reason: format!("{status}: {message}"),
        }
    }
}

/// Pull a human-readable message out of an error response, trying the
/// field names GoTrue and PostgREST use before falling back to raw text.
async fn read_error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    text
}
