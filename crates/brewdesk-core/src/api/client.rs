//! API client for the brewdesk account service.
//!
//! This module provides the `ApiClient` struct for the three auth endpoints
//! (register, login, profile) and the generic JSON `request` they share.

use std::time::{Duration, Instant};

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{AuthResponse, Credentials, LoginRequest, RegisterRequest, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

const REGISTER_PATH: &str = "/auth/register";
const LOGIN_PATH: &str = "/auth/login";
const PROFILE_PATH: &str = "/auth/profile";

/// API client for the account service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the standard request deadline
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a client with a custom deadline. Used by tests to exercise
    /// timeouts without waiting the full ten seconds.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Unknown("Token contains invalid header characters".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send a JSON request to `path` under the base URL and decode the reply.
    ///
    /// Non-2xx replies become `ApiError::HttpStatus`; transport failures are
    /// classified by `ApiError::from_transport`. Nothing is retried.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(Self::auth_headers(bearer)?);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(method = %method, url = %url, has_body = body.is_some(), "API request");

        let response = builder.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "API request failed");
            ApiError::from_transport(e, &self.base_url)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Failed to read API response body");
            ApiError::from_transport(e, &self.base_url)
        })?;

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API response"
        );

        if !status.is_success() {
            let err = ApiError::from_status(status, &text);
            warn!(method = %method, url = %url, status = status.as_u16(), error = %err, "API error response");
            return Err(err);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::MalformedResponse(format!("{} returned unexpected JSON: {}", path, e)))
    }

    /// Create an account. The reply carries a token and possibly the user.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Credentials, ApiError> {
        let response: AuthResponse = self
            .request(Method::POST, REGISTER_PATH, Some(request), None)
            .await?;
        Self::into_credentials(response, REGISTER_PATH)
    }

    /// Exchange email and password for a session token.
    pub async fn login(&self, request: &LoginRequest) -> Result<Credentials, ApiError> {
        let response: AuthResponse = self
            .request(Method::POST, LOGIN_PATH, Some(request), None)
            .await?;
        Self::into_credentials(response, LOGIN_PATH)
    }

    /// Fetch the profile for an explicit token.
    pub async fn profile(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.request::<UserProfile, ()>(Method::GET, PROFILE_PATH, None, Some(token))
            .await
    }

    fn into_credentials(response: AuthResponse, path: &str) -> Result<Credentials, ApiError> {
        let token = response.normalized_token().map(str::to_string);
        debug!(
            endpoint = path,
            has_token = token.is_some(),
            has_user = response.user.is_some(),
            "Auth response received"
        );

        match token {
            Some(token) => Ok(Credentials {
                token,
                user: response.user,
            }),
            None => Err(ApiError::MalformedResponse(
                "server returned neither 'accessToken' nor 'token'".to_string(),
            )),
        }
    }
}
