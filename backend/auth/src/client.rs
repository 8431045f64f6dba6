//! GoTrue REST client.
//!
//! `token?grant_type=password`, `token?grant_type=refresh_token`, `signup`
//! and `logout` under `{project_url}/auth/v1`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::refresh::SessionRefresher;
use crate::session::AuthSession;
use crate::validation::{validate_login, validate_signup};

pub struct HostedAuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Result of a sign-up: providers that require email confirmation return
/// only the user.
#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired { email: String },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            user_id: self.user.id,
            email: self.user.email,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

impl HostedAuthClient {
    /// `project_url` must carry a scheme and a host, e.g. `https://project.supabase.co`.
    pub fn new(
        project_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let trimmed = project_url.trim().trim_end_matches('/');
        let valid = Url::parse(trimmed)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            return Err(AuthError::Validation(format!(
                "Invalid Supabase URL '{project_url}'. Use the form https://your-project-id.supabase.co"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: format!("{trimmed}/auth/v1"),
            api_key: api_key.into(),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        validate_login(email, password)?;
        let body = json!({ "email": email.trim(), "password": password });
        let response = self.post("token?grant_type=password", &body, None).await?;
        let session = parse_token(response).await?;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        validate_signup(email, password, confirm)?;
        let email = email.trim();
        let body = json!({ "email": email, "password": password });
        let response = self.post("signup", &body, None).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        if value.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(value).map_err(|e| AuthError::Malformed(e.to_string()))?;
            info!(user_id = %token.user.id, "Signed up and signed in");
            return Ok(SignUpOutcome::SignedIn(token.into_session()));
        }
        info!("Signed up; email confirmation pending");
        Ok(SignUpOutcome::ConfirmationRequired {
            email: email.to_string(),
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let body = json!({ "refresh_token": refresh_token });
        let response = self.post("token?grant_type=refresh_token", &body, None).await?;
        let session = parse_token(response).await?;
        debug!(user_id = %session.user_id, "Session refreshed");
        Ok(session)
    }

    /// Revoke the session server-side. Local state is cleared by the caller
    /// regardless of the outcome.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.post("logout", &json!({}), Some(access_token)).await?;
        Ok(())
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Response, AuthError> {
        let mut request = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header("apikey", &self.api_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Auth provider unreachable");
            AuthError::Connection(e.to_string())
        })?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = provider_message(&text).unwrap_or_else(|| format!("{status}"));
        debug!(%status, %message, "Auth provider rejected request");
        Err(AuthError::from_provider_message(&message))
    }
}

async fn parse_token(response: Response) -> Result<AuthSession, AuthError> {
    response
        .json::<TokenResponse>()
        .await
        .map(TokenResponse::into_session)
        .map_err(|e| AuthError::Malformed(e.to_string()))
}

/// GoTrue uses several error shapes across versions.
fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl SessionRefresher for HostedAuthClient {
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.refresh(refresh_token).await
    }
}
