//! API client for communicating with the trackwire REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests. Expired credentials are absorbed transparently: a 401 response
//! triggers the refresh protocol and the original call is re-issued exactly
//! once with the new token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{multipart, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::AuthStore;
use crate::config::Config;
use crate::models::{LoginResponse, UploadResponse};
use crate::notify::{Notice, NoticeBus};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token refresh endpoint, relative to the API base
const REFRESH_PATH: &str = "/auth/refresh";

/// File upload endpoint, relative to the API base
const UPLOAD_PATH: &str = "/files/upload";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// API client for the trackwire backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Arc<AuthStore>,
    notices: NoticeBus,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &Config, auth: Arc<AuthStore>, notices: NoticeBus) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.clone(),
            auth,
            notices,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Resilient request core =====

    /// Perform one logical JSON request, absorbing at most one 401.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let token = self.auth.access_token();
        let response = self
            .send(method.clone(), path, body, token.as_deref())
            .await
            .map_err(ApiError::Network)
            .with_context(|| format!("Failed to send {} request to {}", method, path))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::decode(response).await;
        }

        debug!(path, "Received 401, attempting token refresh");
        match self.refresh_access_token().await {
            Some(new_token) => {
                let retry = self
                    .send(method.clone(), path, body, Some(&new_token))
                    .await
                    .map_err(ApiError::Network)
                    .with_context(|| format!("Failed to re-send {} request to {}", method, path))?;
                // A second 401 is not retried again; decode surfaces it as a
                // plain request failure.
                Self::decode(retry).await
            }
            None => self.expire_session(path),
        }
    }

    /// Upload a file as a multipart payload, under the same single-retry
    /// contract as JSON requests.
    pub async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        let token = self.auth.access_token();
        let response = self
            .send_upload(filename, bytes.clone(), token.as_deref())
            .await
            .map_err(ApiError::Network)
            .context("Failed to send upload request")?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::decode(response).await;
        }

        debug!("Upload received 401, attempting token refresh");
        match self.refresh_access_token().await {
            Some(new_token) => {
                let retry = self
                    .send_upload(filename, bytes, Some(&new_token))
                    .await
                    .map_err(ApiError::Network)
                    .context("Failed to re-send upload request")?;
                Self::decode(retry).await
            }
            None => self.expire_session(UPLOAD_PATH),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            // .json() also sets Content-Type: application/json
            request = request.json(body);
        }
        request.send().await
    }

    async fn send_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        token: Option<&str>,
    ) -> std::result::Result<Response, reqwest::Error> {
        // The form is rebuilt for every attempt; Content-Type is left to the
        // transport so the multipart boundary is set correctly.
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);

        let mut request = self.client.post(self.url(UPLOAD_PATH)).multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    /// Check the response status and decode the JSON body on success.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Request {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        response
            .json()
            .await
            .context("Failed to parse JSON response")
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Yields `None` on any failure - no stored refresh token, a non-success
    /// refresh response, or a network error. Only the new access token is
    /// persisted; the refresh token is not rotated.
    async fn refresh_access_token(&self) -> Option<String> {
        let refresh_token = self.auth.refresh_token()?;

        let response = match self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Failed to send refresh request");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Refresh endpoint rejected the stored token");
            return None;
        }

        let parsed: RefreshResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "Failed to parse refresh response");
                return None;
            }
        };

        self.auth.set_access_token(parsed.access_token.clone());
        self.notices.emit(Notice::SessionRefreshed);
        debug!("Access token refreshed");
        Some(parsed.access_token)
    }

    /// Terminal failure path: the session cannot be recovered. Signs the
    /// user out before surfacing the error; callers must not retry.
    ///
    /// The expiry notice goes out ahead of the logout so the UI sees it
    /// before the sign-in redirect.
    fn expire_session<T>(&self, path: &str) -> Result<T> {
        warn!(path, "Token refresh failed, ending session");
        self.notices.emit(Notice::SessionExpired);
        self.auth.logout();
        Err(ApiError::SessionExpired.into())
    }

    // ===== Generic verbs =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(Method::DELETE, path, None).await
    }

    // ===== Endpoint wrappers =====

    /// Authenticate with email and password.
    ///
    /// Returns the session payload; committing it to the credential store
    /// via `AuthStore::set_auth` is the caller's decision.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        self.post("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Fetch all issues visible to the current user
    pub async fn issues(&self) -> Result<Vec<Value>> {
        self.get("/issues").await
    }

    /// Fetch a single issue by id
    pub async fn issue(&self, issue_id: &str) -> Result<Value> {
        self.get(&format!("/issues/{}", issue_id)).await
    }

    pub async fn create_issue(&self, issue: &Value) -> Result<Value> {
        self.post("/issues", issue).await
    }

    pub async fn update_issue(&self, issue_id: &str, update: &Value) -> Result<Value> {
        self.put(&format!("/issues/{}", issue_id), update).await
    }

    pub async fn delete_issue(&self, issue_id: &str) -> Result<Value> {
        self.delete(&format!("/issues/{}", issue_id)).await
    }

    /// Fetch all users
    pub async fn users(&self) -> Result<Vec<Value>> {
        self.get("/users").await
    }

    pub async fn create_user(&self, user: &Value) -> Result<Value> {
        self.post("/users", user).await
    }

    pub async fn update_user(&self, user_id: &str, update: &Value) -> Result<Value> {
        self.put(&format!("/users/{}", user_id), update).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<Value> {
        self.delete(&format!("/users/{}", user_id)).await
    }
}
