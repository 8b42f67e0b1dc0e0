use async_trait::async_trait;
use pollwatch::auth::Credential;
use pollwatch::error::FetchError;
use pollwatch::source::SourceClient;
use reqwest::Client;

use super::BroadcasterStatus;
use super::models::UsersResponse;
use crate::utils::send_for_json;

/// Looks up a Twitch user by login through the Helix API.
pub struct TwitchUsers {
    client: Client,
    client_id: String,
    api_base: String,
}

impl TwitchUsers {
    pub const API_BASE: &str = "https://api.twitch.tv";

    pub fn new(client: Client, client_id: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            api_base: Self::API_BASE.to_string(),
        }
    }

    /// Point at another API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SourceClient for TwitchUsers {
    type Snapshot = BroadcasterStatus;

    fn kind(&self) -> &'static str {
        "twitch"
    }

    async fn fetch(
        &self,
        login: &str,
        credential: Option<&Credential>,
    ) -> Result<BroadcasterStatus, FetchError> {
        let mut request = self
            .client
            .get(format!("{}/helix/users", self.api_base))
            .query(&[("login", login)])
            .header("Client-Id", &self.client_id);
        if let Some(credential) = credential {
            request = request.header(reqwest::header::AUTHORIZATION, credential.bearer());
        }

        let response: UsersResponse = send_for_json(request).await?;
        let mut users = response.data.into_iter();
        match (users.next(), users.next()) {
            (Some(user), None) => Ok(BroadcasterStatus::from(user)),
            (None, _) => Err(FetchError::classification(format!(
                "no user found for login {}",
                login
            ))),
            (Some(_), Some(_)) => Err(FetchError::classification(format!(
                "more than one user found for login {}",
                login
            ))),
        }
    }
}
