//! Wire contracts owned by this layer.
//!
//! Domain entities (issues, users) are deliberately *not* modeled here: the
//! resilience layer passes them through untouched as `serde_json::Value`.
//! Only the responses whose shape this layer depends on get structs.

use serde::Deserialize;
use serde_json::Value;

/// Authenticated user's profile data. Opaque to this layer; the UI decides
/// what to read out of it.
pub type UserProfile = Value;

/// Response body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Absent in flows that only rotate the access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The signed-in user's profile, passed through untouched.
    #[serde(default)]
    pub user: UserProfile,
}

/// Response body of `POST /files/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub file_url: String,
}
