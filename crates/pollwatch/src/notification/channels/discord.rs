//! Discord sink for watcher notifications.
//!
//! Posts one embed per notification, either as a bot into a channel or through
//! a webhook. A 429 response is retried after its `Retry-After` delay, up to
//! a small fixed number of attempts; other failures are returned at once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::NotificationSink;
use crate::error::NotifyError;
use crate::notification::events::{Notification, NotificationPriority};

/// Maximum number of attempts for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Longest wait honoured for a single 429.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Default Discord REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

// Embed limits.
const MAX_TITLE_LEN: usize = 256;
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_FIELD_NAME_LEN: usize = 256;
const MAX_FIELD_VALUE_LEN: usize = 1024;
const MAX_FIELDS: usize = 25;

/// Where messages go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscordTarget {
    /// Post as a bot into a text channel.
    Bot { token: String, channel_id: u64 },
    /// Post through a webhook URL.
    Webhook { url: String },
}

/// Where and how to post Discord embeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Disabled sinks drop every notification.
    pub enabled: bool,
    /// Bot token (bot mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Text channel id (bot mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
    /// Webhook URL (webhook mode, wins over bot mode when both are set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Display name override (webhook mode only).
    pub username: Option<String>,
    /// Avatar override (webhook mode only).
    pub avatar_url: Option<String>,
    /// Minimum priority level to send (default: Low, i.e. everything).
    pub min_priority: NotificationPriority,
    /// REST base URL.
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            channel_id: None,
            webhook_url: None,
            username: Some("pollwatch".to_string()),
            avatar_url: None,
            min_priority: NotificationPriority::Low,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl DiscordConfig {
    /// Resolve the delivery target, if enough is configured.
    pub fn target(&self) -> Option<DiscordTarget> {
        if let Some(url) = self.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(DiscordTarget::Webhook {
                url: url.to_string(),
            });
        }
        match (self.bot_token.as_deref(), self.channel_id) {
            (Some(token), Some(channel_id)) if !token.is_empty() => Some(DiscordTarget::Bot {
                token: token.to_string(),
                channel_id,
            }),
            _ => None,
        }
    }
}

/// Posts notifications as Discord embeds.
pub struct DiscordChannel {
    config: DiscordConfig,
    target: Option<DiscordTarget>,
    client: Client,
}

impl DiscordChannel {
    /// Create a new Discord channel with its own HTTP client.
    pub fn new(config: DiscordConfig) -> crate::Result<Self> {
        let client = crate::utils::http_client::default_client()?;
        Ok(Self::with_client(config, client))
    }

    /// Create a new Discord channel sharing an existing client.
    pub fn with_client(config: DiscordConfig, client: Client) -> Self {
        let target = config.target();
        Self {
            config,
            target,
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.target.is_some()
    }

    /// Embed side colour for a priority.
    fn get_color(priority: NotificationPriority) -> u32 {
        match priority {
            NotificationPriority::Low => 0x808080,      // Gray
            NotificationPriority::Normal => 0x3498db,   // Blue
            NotificationPriority::High => 0xf39c12,     // Orange
            NotificationPriority::Critical => 0xe74c3c, // Red
        }
    }

    fn message_url(&self, target: &DiscordTarget) -> String {
        match target {
            DiscordTarget::Bot { channel_id, .. } => format!(
                "{}/channels/{}/messages",
                self.config.api_base.trim_end_matches('/'),
                channel_id
            ),
            DiscordTarget::Webhook { url } => url.clone(),
        }
    }

    fn authorize(request: reqwest::RequestBuilder, target: &DiscordTarget) -> reqwest::RequestBuilder {
        match target {
            DiscordTarget::Bot { token, .. } => {
                request.header(reqwest::header::AUTHORIZATION, format!("Bot {}", token))
            }
            DiscordTarget::Webhook { .. } => request,
        }
    }

    /// Build the message payload for a notification.
    fn build_payload(&self, notification: &Notification, target: &DiscordTarget) -> serde_json::Value {
        let mut embed = json!({
            "title": truncate(&notification.title, MAX_TITLE_LEN),
            "color": Self::get_color(notification.priority),
            "timestamp": notification.timestamp.to_rfc3339(),
            "footer": {
                "text": format!("{} | {}", notification.kind, notification.priority)
            }
        });

        if let Some(description) = &notification.description {
            embed["description"] = json!(truncate(description, MAX_DESCRIPTION_LEN));
        }
        if let Some(url) = &notification.url {
            embed["url"] = json!(url);
        }
        if let Some(image_url) = &notification.image_url {
            embed["image"] = json!({ "url": image_url });
        }
        if let Some(author) = &notification.author {
            embed["author"] = json!({ "name": truncate(author, MAX_TITLE_LEN) });
        }
        if !notification.fields.is_empty() {
            let fields: Vec<_> = notification
                .fields
                .iter()
                .take(MAX_FIELDS)
                .map(|f| {
                    json!({
                        "name": truncate(&f.name, MAX_FIELD_NAME_LEN),
                        "value": truncate(&f.value, MAX_FIELD_VALUE_LEN),
                    })
                })
                .collect();
            embed["fields"] = json!(fields);
        }

        let mut payload = json!({
            "embeds": [embed]
        });

        if matches!(target, DiscordTarget::Webhook { .. }) {
            if let Some(username) = &self.config.username {
                payload["username"] = json!(username);
            }
            if let Some(avatar_url) = &self.config.avatar_url {
                payload["avatar_url"] = json!(avatar_url);
            }
        }

        payload
    }

    /// POST the payload, waiting out 429 responses.
    async fn send_with_retry(
        &self,
        target: &DiscordTarget,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        let url = self.message_url(target);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = Self::authorize(self.client.post(&url), target)
                .json(payload)
                .send()
                .await?;

            let status = response.status();

            if status.is_success() {
                return Ok(());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(&response);

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Discord rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(NotifyError::RateLimited { attempts });
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    "Discord rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            // not retried
            let body = response.text().await.unwrap_or_default();
            warn!("Discord delivery failed: {} - {}", status, body);
            return Err(NotifyError::Rejected { status, body });
        }
    }

    /// Check that the configured channel or webhook is reachable.
    pub async fn verify(&self) -> Result<(), NotifyError> {
        let Some(target) = &self.target else {
            return Err(NotifyError::Disabled);
        };

        let url = match target {
            DiscordTarget::Bot { channel_id, .. } => format!(
                "{}/channels/{}",
                self.config.api_base.trim_end_matches('/'),
                channel_id
            ),
            DiscordTarget::Webhook { url } => url.clone(),
        };

        let response = Self::authorize(self.client.get(&url), target).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        info!("Discord channel reachable");
        Ok(())
    }
}

/// Wait time of a 429, from `Retry-After` or Discord's reset header.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .filter_map(|value| retry_after_secs(value.to_str().ok()?))
        .next()
}

/// Seconds value of a rate-limit header, capped at [`MAX_RETRY_AFTER`].
fn retry_after_secs(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    if secs.is_nan() || secs < 0.0 {
        return None;
    }
    Some(
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_RETRY_AFTER, |wait| wait.min(MAX_RETRY_AFTER)),
    )
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[async_trait]
impl NotificationSink for DiscordChannel {
    fn sink_type(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(target) = self.target.as_ref().filter(|_| self.config.enabled) else {
            return Err(NotifyError::Disabled);
        };

        // Check priority filter
        if notification.priority < self.config.min_priority {
            debug!(
                "Skipping Discord notification for {} (priority {} < {})",
                notification.entity_id, notification.priority, self.config.min_priority
            );
            return Ok(());
        }

        let payload = self.build_payload(notification, target);
        self.send_with_retry(target, &payload).await?;

        debug!("Discord notification sent: {}", notification.kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::events::NotificationKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bot_config(api_base: String) -> DiscordConfig {
        DiscordConfig {
            bot_token: Some("secret".to_string()),
            channel_id: Some(42),
            api_base,
            ..Default::default()
        }
    }

    fn sample() -> Notification {
        Notification::new(NotificationKind::New, "7", "New product")
            .with_url("https://example.com/7")
            .with_image("https://example.com/7.png")
            .with_author("Circle")
            .with_field("Price", "1000 => 800")
    }

    #[test]
    fn test_discord_config_target() {
        let config = DiscordConfig::default();
        assert_eq!(config.target(), None);

        let config = bot_config(DEFAULT_API_BASE.to_string());
        assert_eq!(
            config.target(),
            Some(DiscordTarget::Bot {
                token: "secret".to_string(),
                channel_id: 42
            })
        );

        let config = DiscordConfig {
            webhook_url: Some("https://discord.com/api/webhooks/x".to_string()),
            ..bot_config(DEFAULT_API_BASE.to_string())
        };
        assert!(matches!(config.target(), Some(DiscordTarget::Webhook { .. })));
    }

    #[test]
    fn test_get_color() {
        assert_eq!(
            DiscordChannel::get_color(NotificationPriority::Low),
            0x808080
        );
        assert_eq!(
            DiscordChannel::get_color(NotificationPriority::Critical),
            0xe74c3c
        );
    }

    #[test]
    fn test_build_payload_embed() {
        let channel = DiscordChannel::with_client(
            bot_config(DEFAULT_API_BASE.to_string()),
            crate::utils::http_client::default_client().unwrap(),
        );
        let target = channel.target.clone().unwrap();
        let payload = channel.build_payload(&sample(), &target);

        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "New product");
        assert_eq!(embed["url"], "https://example.com/7");
        assert_eq!(embed["image"]["url"], "https://example.com/7.png");
        assert_eq!(embed["author"]["name"], "Circle");
        assert_eq!(embed["fields"][0]["name"], "Price");
        assert_eq!(embed["fields"][0]["value"], "1000 => 800");
        // Bot messages cannot override the author identity.
        assert!(payload.get("username").is_none());
    }

    #[test]
    fn test_retry_after_secs() {
        assert_eq!(retry_after_secs("0"), Some(Duration::ZERO));
        assert_eq!(retry_after_secs(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(retry_after_secs("1e20"), Some(MAX_RETRY_AFTER));
        assert_eq!(retry_after_secs("inf"), Some(MAX_RETRY_AFTER));
        assert_eq!(retry_after_secs("-1"), None);
        assert_eq!(retry_after_secs("NaN"), None);
        assert_eq!(retry_after_secs("soon"), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let cut = truncate(&"x".repeat(300), MAX_TITLE_LEN);
        assert_eq!(cut.chars().count(), MAX_TITLE_LEN);
        assert!(cut.ends_with('…'));
    }

    #[tokio::test]
    async fn test_deliver_posts_to_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .and(header("authorization", "Bot secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(bot_config(server.uri())).unwrap();
        channel.deliver(&sample()).await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_retries_after_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(bot_config(server.uri())).unwrap();
        channel.deliver(&sample()).await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(u64::from(MAX_RATE_LIMIT_RETRIES))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(bot_config(server.uri())).unwrap();
        let err = channel.deliver(&sample()).await.unwrap_err();
        assert!(matches!(err, NotifyError::RateLimited { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_deliver_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(bot_config(server.uri())).unwrap();
        let err = channel.deliver(&sample()).await.unwrap_err();
        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
                assert_eq!(body, "Missing Access");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "42" })))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(bot_config(server.uri())).unwrap();
        channel.verify().await.unwrap();
    }

    #[tokio::test]
    async fn test_unconfigured_channel_is_disabled() {
        let channel = DiscordChannel::with_client(
            DiscordConfig::default(),
            crate::utils::http_client::default_client().unwrap(),
        );
        assert!(!channel.is_enabled());
        assert!(matches!(
            channel.deliver(&sample()).await,
            Err(NotifyError::Disabled)
        ));
    }
}
