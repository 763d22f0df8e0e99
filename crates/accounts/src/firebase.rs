//! Identity Toolkit REST client (email/password and federated sign-in).

use crate::error::{AuthError, AuthErrorCode};
use crate::identity::{ExternalCredential, IdentityProvider, Session};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::config::IdentityConfig;
use shared::http;
use std::time::Duration;
use tracing::{debug, info};

/// Public Identity Toolkit endpoint
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    #[serde(default)]
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

impl AuthResponse {
    fn into_session(self, provider_id: &str) -> Session {
        Session {
            user_id: self.local_id,
            email: self.email,
            display_name: self.display_name.filter(|name| !name.is_empty()),
            photo_url: self.photo_url.filter(|url| !url.is_empty()),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            provider_id: self.provider_id.unwrap_or_else(|| provider_id.to_string()),
            is_new_user: self.is_new_user,
        }
    }
}

/// Identity provider backed by the Identity Toolkit REST API
pub struct FirebaseAuth {
    client: Client,
    base_url: String,
    api_key: String,
    /// Redirect URI sent with federated sign-in
    request_uri: String,
}

impl FirebaseAuth {
    pub fn new(api_key: impl Into<String>, auth_domain: &str) -> Result<Self> {
        let request_uri = if auth_domain.is_empty() {
            "http://localhost".to_string()
        } else {
            format!("https://{}", auth_domain.trim_start_matches("https://"))
        };

        Ok(Self {
            client: http::build_client(REQUEST_TIMEOUT)?,
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            api_key: api_key.into(),
            request_uri,
        })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            debug!("Identity API key is empty, account requests will be rejected");
        }
        Self::new(config.api_key.clone(), &config.auth_domain)
    }

    /// Point the client at another endpoint (emulator, proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn post(&self, method: &str, body: Value) -> Result<AuthResponse, AuthError> {
        let url = self.endpoint(method);
        debug!(method = method, "Identity request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::new(AuthErrorCode::NetworkRequestFailed, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::new(AuthErrorCode::NetworkRequestFailed, e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            AuthError::new(
                AuthErrorCode::Other("auth/internal-error".to_string()),
                e.to_string(),
            )
        })
    }
}

/// Map an error response body to an auth error
///
/// The API answers `{"error": {"message": "EMAIL_EXISTS", ...}}`.
fn parse_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    match message {
        Some(message) => AuthError::from_code(&message),
        None if status == 429 => AuthError::new(AuthErrorCode::TooManyRequests, body),
        None => AuthError::new(
            AuthErrorCode::Other("auth/internal-error".to_string()),
            format!("status {}", status),
        ),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .post(
                "signUp",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;
        info!(email = email, "Account created");

        let mut session = response.into_session("password");
        session.is_new_user = true;
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .post(
                "signInWithPassword",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;
        Ok(response.into_session("password"))
    }

    async fn sign_in_external(
        &self,
        credential: &ExternalCredential,
    ) -> Result<Session, AuthError> {
        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(&credential.id_token),
            urlencoding::encode(&credential.provider_id)
        );
        let response = self
            .post(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": self.request_uri,
                    "returnIdpCredential": true,
                    "returnSecureToken": true
                }),
            )
            .await?;
        Ok(response.into_session(&credential.provider_id))
    }

    async fn update_display_name(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .post(
                "update",
                json!({
                    "idToken": session.id_token,
                    "displayName": display_name,
                    "returnSecureToken": true
                }),
            )
            .await?;

        let mut updated = session.clone();
        updated.display_name = Some(display_name.to_string());
        if !response.id_token.is_empty() {
            updated.id_token = response.id_token;
        }
        if !response.refresh_token.is_empty() {
            updated.refresh_token = response.refresh_token;
        }
        Ok(updated)
    }
}
