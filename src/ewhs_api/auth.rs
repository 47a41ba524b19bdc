use crate::ewhs_api::types::{
    ApiError, EwhsError, LoginRequest, RefreshRequest, TokenResponse,
};
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Login endpoint, relative to the API base URL
pub const LOGIN_PATH: &str = "wms/auth/login";
/// Refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "wms/auth/refresh";

/// Source of the current time in epoch seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Account credentials and scoping codes
///
/// The password is kept as a secret and never shows up in `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
    customer_code: Option<String>,
    wms_code: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            customer_code: None,
            wms_code: None,
        }
    }

    pub fn with_customer_code(mut self, customer_code: Option<String>) -> Self {
        self.customer_code = customer_code.filter(|c| !c.is_empty());
        self
    }

    pub fn with_wms_code(mut self, wms_code: Option<String>) -> Self {
        self.wms_code = wms_code.filter(|c| !c.is_empty());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn customer_code(&self) -> Option<&str> {
        self.customer_code.as_deref()
    }

    pub fn wms_code(&self) -> Option<&str> {
        self.wms_code.as_deref()
    }
}

/// Access/refresh token pair with its expiry
///
/// `expires_at` is in epoch seconds; 0 means no token was ever obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

impl TokenState {
    /// Whether the access token can be used at time `now`
    ///
    /// The token stays valid up to and including `expires_at`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty()) && now <= self.expires_at
    }

    fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    fn apply(&mut self, response: TokenResponse) {
        self.refresh_token = Some(response.refresh_token);
        self.access_token = Some(response.token);
        self.expires_at = response.expires_at;
    }
}

/// Owns the token lifecycle for one set of credentials
///
/// The state lock is held for the whole exchange, so concurrent callers that
/// all see an expired token wait for a single login or refresh and then reuse
/// its result.
pub struct TokenManager {
    base_url: String,
    credentials: Credentials,
    state: Mutex<TokenState>,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub(crate) fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        http: reqwest::Client,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            state: Mutex::new(TokenState::default()),
            clock,
            http,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Snapshot of the current token state
    pub async fn state(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Replace the token state, e.g. with a pair saved by a previous session
    pub async fn restore(&self, state: TokenState) {
        *self.state.lock().await = state;
    }

    /// Drop the refresh token so the next exchange is a full login
    pub async fn clear_refresh_token(&self) {
        let mut state = self.state.lock().await;
        state.refresh_token = None;
        tracing::debug!("Refresh token cleared, next exchange will log in");
    }

    /// Forget all tokens
    pub async fn reset(&self) {
        *self.state.lock().await = TokenState::default();
    }

    /// Return a valid access token, running an exchange first if needed
    ///
    /// `headers` are sent on the exchange; they must not carry an
    /// `Authorization` header.
    pub(crate) async fn ensure_authenticated(&self, headers: &HeaderMap) -> Result<String, EwhsError> {
        let mut state = self.state.lock().await;

        if !state.is_valid_at(self.clock.now()) {
            tracing::debug!(
                "Access token missing or expired (expires_at={}), re-authenticating",
                state.expires_at
            );
            self.exchange_locked(&mut state, headers).await?;
        }

        state
            .access_token
            .clone()
            .ok_or_else(|| EwhsError::Authentication {
                message: "No access token available".to_string(),
                body: None,
            })
    }

    /// Run a refresh exchange when a refresh token is held, otherwise a login
    ///
    /// A failed refresh is reported as is; it does not fall back to login.
    pub(crate) async fn obtain_access_token(&self, headers: &HeaderMap) -> Result<String, EwhsError> {
        let mut state = self.state.lock().await;
        self.exchange_locked(&mut state, headers).await?;
        Ok(state.access_token.clone().unwrap_or_default())
    }

    async fn exchange_locked(
        &self,
        state: &mut TokenState,
        headers: &HeaderMap,
    ) -> Result<(), EwhsError> {
        let response = match state.refresh_token() {
            Some(refresh_token) => {
                tracing::debug!("Refreshing access token");
                self.exchange(REFRESH_PATH, &RefreshRequest { refresh_token }, headers)
                    .await?
            }
            None => {
                tracing::debug!("Logging in as {}", self.credentials.username);
                let request = LoginRequest {
                    username: &self.credentials.username,
                    password: self.credentials.password.expose_secret(),
                };
                self.exchange(LOGIN_PATH, &request, headers).await?
            }
        };

        tracing::info!("Access token obtained, expires_at={}", response.expires_at);
        state.apply(response);
        Ok(())
    }

    async fn exchange<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        headers: &HeaderMap,
    ) -> Result<TokenResponse, EwhsError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send authentication request to {}: {}", url, e);
                ApiError::from(e)
            })?;

        let status = response.status();
        tracing::debug!("Received authentication response with status: {}", status);

        let text = response.text().await.map_err(ApiError::from)?;

        if status != StatusCode::OK {
            let body: Option<Value> = serde_json::from_str(&text).ok();
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    if text.is_empty() {
                        status.to_string()
                    } else {
                        text.clone()
                    }
                });

            tracing::error!(
                "Authentication failed: HTTP {} - {}",
                status.as_u16(),
                message
            );
            return Err(EwhsError::Authentication { message, body });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to parse authentication response: {}", e);
            EwhsError::Protocol(format!("Failed to parse token response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_invalid() {
        let state = TokenState::default();
        assert_eq!(state.expires_at, 0);
        assert!(!state.is_valid_at(0));
    }

    #[test]
    fn test_state_valid_until_expiry_inclusive() {
        let state = TokenState {
            access_token: Some("abc".to_string()),
            refresh_token: Some("ref".to_string()),
            expires_at: 1_000,
        };
        assert!(state.is_valid_at(999));
        assert!(state.is_valid_at(1_000));
        assert!(!state.is_valid_at(1_001));
    }

    #[test]
    fn test_empty_access_token_is_invalid() {
        let state = TokenState {
            access_token: Some(String::new()),
            refresh_token: None,
            expires_at: i64::MAX,
        };
        assert!(!state.is_valid_at(0));
    }

    #[test]
    fn test_apply_overwrites_all_fields() {
        let mut state = TokenState {
            access_token: Some("old".to_string()),
            refresh_token: Some("old-refresh".to_string()),
            expires_at: 10,
        };
        state.apply(TokenResponse {
            refresh_token: "new-refresh".to_string(),
            token: "new".to_string(),
            expires_at: 20,
        });
        assert_eq!(state.access_token.as_deref(), Some("new"));
        assert_eq!(state.refresh_token.as_deref(), Some("new-refresh"));
        assert_eq!(state.expires_at, 20);
    }

    #[test]
    fn test_empty_refresh_token_is_ignored() {
        let state = TokenState {
            access_token: None,
            refresh_token: Some(String::new()),
            expires_at: 0,
        };
        assert_eq!(state.refresh_token(), None);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("user", SecretString::from("hunter2".to_string()));
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_empty_scoping_codes_are_dropped() {
        let credentials = Credentials::new("user", SecretString::from("pw".to_string()))
            .with_customer_code(Some(String::new()))
            .with_wms_code(Some("WMS".to_string()));
        assert_eq!(credentials.customer_code(), None);
        assert_eq!(credentials.wms_code(), Some("WMS"));
    }

    #[tokio::test]
    async fn test_clear_refresh_token_and_reset() {
        let manager = TokenManager::new(
            "http://localhost",
            Credentials::new("user", SecretString::from("pw".to_string())),
            reqwest::Client::new(),
            Arc::new(SystemClock),
        );
        let saved = TokenState {
            access_token: Some("a".to_string()),
            refresh_token: Some("r".to_string()),
            expires_at: 42,
        };
        manager.restore(saved.clone()).await;
        assert_eq!(manager.state().await, saved);

        manager.clear_refresh_token().await;
        assert_eq!(manager.state().await.refresh_token, None);
        assert_eq!(manager.state().await.access_token.as_deref(), Some("a"));

        manager.reset().await;
        assert_eq!(manager.state().await, TokenState::default());
    }
}
