use std::time::Duration;

use async_trait::async_trait;
use pollwatch::auth::{Authenticator, Credential};
use pollwatch::error::AuthError;
use reqwest::Client;
use tracing::debug;

use super::models::{TokenResponse, ValidateResponse};

/// Client-credentials login against the Twitch identity service.
pub struct TwitchAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    id_base: String,
}

impl TwitchAuth {
    pub const ID_BASE: &str = "https://id.twitch.tv";

    pub fn new(client: Client, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            id_base: Self::ID_BASE.to_string(),
        }
    }

    /// Point at another identity host.
    pub fn with_id_base(mut self, id_base: impl Into<String>) -> Self {
        self.id_base = id_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[async_trait]
impl Authenticator for TwitchAuth {
    fn platform_id(&self) -> &'static str {
        "twitch"
    }

    async fn exchange(&self) -> Result<Credential, AuthError> {
        let url = format!("{}/oauth2/token", self.id_base);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{} returned {}: {}", url, status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("malformed token response: {}", e)))?;
        debug!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = ?token.expires_in,
            "Obtained app access token"
        );

        Ok(match token.expires_in {
            Some(secs) => Credential::expiring_in(token.access_token, Duration::from_secs(secs)),
            None => Credential::new(token.access_token),
        })
    }

    async fn validate(&self, credential: &Credential) -> Result<Duration, AuthError> {
        let url = format!("{}/oauth2/validate", self.id_base);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Validation(format!("{} returned {}", url, status)));
        }

        let validated: ValidateResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Validation(format!("malformed validate response: {}", e)))?;
        if let Some(client_id) = validated.client_id.as_deref() {
            if client_id != self.client_id {
                return Err(AuthError::Validation(format!(
                    "token belongs to client {}",
                    client_id
                )));
            }
        }

        Ok(Duration::from_secs(validated.expires_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollwatch::auth::AuthSession;
    use pollwatch::config::AuthConfig;
    use pollwatch::utils::http_client::default_client;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth(server: &MockServer) -> TwitchAuth {
        TwitchAuth::new(default_client().unwrap(), "cid", "secret").with_id_base(server.uri())
    }

    #[tokio::test]
    async fn test_exchange_sends_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(query_param("client_id", "cid"))
            .and(query_param("client_secret", "secret"))
            .and(query_param("grant_type", "client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc",
                "expires_in": 5000000,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = auth(&server).exchange().await.unwrap();
        assert_eq!(credential.access_token, "abc");
        assert!(credential.remaining().unwrap() > Duration::from_secs(4_000_000));
    }

    #[tokio::test]
    async fn test_exchange_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid client secret"))
            .mount(&server)
            .await;

        let err = auth(&server).exchange().await.unwrap_err();
        assert!(matches!(err, AuthError::Exchange(msg) if msg.contains("invalid client secret")));
    }

    #[tokio::test]
    async fn test_validate_reports_remaining_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/validate"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "client_id": "cid",
                "scopes": [],
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let remaining = auth(&server).validate(&Credential::new("abc")).await.unwrap();
        assert_eq!(remaining, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_validate_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/validate"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "status": 401,
                "message": "invalid access token"
            })))
            .mount(&server)
            .await;

        let err = auth(&server).validate(&Credential::new("stale")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_session_replaces_stale_preexisting_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/validate"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth2/validate"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_in": 3600 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "fresh" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut session = AuthSession::new(
            Arc::new(auth(&server)),
            AuthConfig {
                retry_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        let credential = session.start(Some(Credential::new("stale"))).await.unwrap();
        assert_eq!(credential.access_token, "fresh");
    }
}
