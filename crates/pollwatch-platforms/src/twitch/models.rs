//! Twitch API payloads.

use serde::Deserialize;

/// `POST /oauth2/token` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// `GET /oauth2/validate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    pub expires_in: u64,
}

/// `GET /helix/users` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    pub data: Vec<HelixUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    /// `""`, `"affiliate"` or `"partner"`.
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
}
