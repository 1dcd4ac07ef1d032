//! Auth/profile service client.
//!
//! The service owns accounts, tokens and the `profiles` table. This module
//! only consumes it: [`AuthBackend`] is the seam the session and the admin
//! panel talk to, and [`RestAuthBackend`] speaks the service's REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::types::{AuthSessionData, AuthTokens, AuthUser, NewAccount, Profile, Role};

/// Operations the app needs from the auth/profile service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange email and password for a session
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSessionData>;

    /// Register an account; `None` when email confirmation is still pending
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Option<AuthSessionData>>;

    /// Revoke the session's tokens
    async fn sign_out(&self, tokens: &AuthTokens) -> AuthResult<()>;

    /// Profile row of a user; `None` when the row does not exist
    async fn fetch_profile(
        &self,
        tokens: &AuthTokens,
        user_id: &str,
    ) -> AuthResult<Option<Profile>>;

    /// All profile rows, newest first
    async fn list_profiles(&self, tokens: &AuthTokens) -> AuthResult<Vec<Profile>>;

    async fn update_role(&self, tokens: &AuthTokens, user_id: &str, role: Role) -> AuthResult<()>;

    /// Create an account with its email already confirmed
    async fn create_account(&self, account: &NewAccount) -> AuthResult<AuthUser>;

    async fn delete_account(&self, user_id: &str) -> AuthResult<()>;
}

/// Token endpoint payload
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSessionData {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            });
        AuthSessionData {
            user: self.user,
            tokens: AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
        }
    }
}

/// REST client for the hosted auth/profile service
#[derive(Debug, Clone)]
pub struct RestAuthBackend {
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    client: reqwest::Client,
}

impl RestAuthBackend {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach the privileged key used for account creation and deletion
    pub fn with_service_key(mut self, key: Option<String>) -> Self {
        self.service_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request carrying the public key, optionally on behalf of a user
    fn public(&self, builder: RequestBuilder, tokens: Option<&AuthTokens>) -> RequestBuilder {
        let bearer = tokens
            .map(|t| t.access_token.as_str())
            .unwrap_or(self.anon_key.as_str());
        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    /// Request carrying the service key
    fn privileged(&self, builder: RequestBuilder) -> AuthResult<RequestBuilder> {
        let key = self.service_key.as_deref().ok_or(AuthError::ServiceKeyMissing)?;
        Ok(builder.header("apikey", key).bearer_auth(key))
    }

    fn profiles_url(&self) -> String {
        self.url("/rest/v1/profiles")
    }
}

/// Turn a non-success response into an error carrying the service's message
async fn check(response: Response) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| format!("request failed with status {}", status));
    warn!("Auth service returned {}: {}", status, message);
    Err(AuthError::rejected(status.as_u16(), message))
}

/// Pull the human-readable message out of an auth or REST error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl AuthBackend for RestAuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSessionData> {
        debug!("Signing in {}", email);
        let response = self
            .public(
                self.client
                    .post(self.url("/auth/v1/token"))
                    .query(&[("grant_type", "password")]),
                None,
            )
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            let message =
                error_message(&body).unwrap_or_else(|| "Invalid login credentials".to_string());
            debug!("Sign-in rejected: {}", message);
            return Err(AuthError::InvalidCredentials(message));
        }

        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into_session())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Option<AuthSessionData>> {
        debug!("Signing up {}", email);
        let response = self
            .public(self.client.post(self.url("/auth/v1/signup")), None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: Value = check(response).await?.json().await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
            Ok(Some(token.into_session()))
        } else {
            Ok(None)
        }
    }

    async fn sign_out(&self, tokens: &AuthTokens) -> AuthResult<()> {
        let response = self
            .public(self.client.post(self.url("/auth/v1/logout")), Some(tokens))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn fetch_profile(
        &self,
        tokens: &AuthTokens,
        user_id: &str,
    ) -> AuthResult<Option<Profile>> {
        let filter = format!("eq.{}", user_id);
        let response = self
            .public(
                self.client
                    .get(self.profiles_url())
                    .query(&[("id", filter.as_str()), ("select", "*")]),
                Some(tokens),
            )
            .send()
            .await?;

        let rows: Vec<Profile> = check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn list_profiles(&self, tokens: &AuthTokens) -> AuthResult<Vec<Profile>> {
        let response = self
            .public(
                self.client
                    .get(self.profiles_url())
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
                Some(tokens),
            )
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn update_role(&self, tokens: &AuthTokens, user_id: &str, role: Role) -> AuthResult<()> {
        let filter = format!("eq.{}", user_id);
        let response = self
            .public(
                self.client
                    .patch(self.profiles_url())
                    .query(&[("id", filter.as_str())]),
                Some(tokens),
            )
            .header("Prefer", "return=minimal")
            .json(&json!({ "role": role }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> AuthResult<AuthUser> {
        let response = self
            .privileged(self.client.post(self.url("/auth/v1/admin/users")))?
            .json(&json!({
                "email": account.email,
                "password": account.password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn delete_account(&self, user_id: &str) -> AuthResult<()> {
        let response = self
            .privileged(
                self.client
                    .delete(self.url(&format!("/auth/v1/admin/users/{}", user_id))),
            )?
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
