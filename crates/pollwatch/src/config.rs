//! Watcher configuration.
//!
//! Runtime settings ([`PollConfig`], [`FeedConfig`], [`AuthConfig`]) carry
//! `Duration`s and are built from the named defaults below. The optional TOML
//! file ([`WatchConfig`]) only overrides what it sets.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notification::DiscordConfig;

/// Tick interval for the Twitch broadcaster-type watcher.
pub const DEFAULT_GOAL_INTERVAL: Duration = Duration::from_secs(30);
/// Tick interval for the issue-status watcher.
pub const DEFAULT_ISSUE_INTERVAL: Duration = Duration::from_secs(60);
/// Tick interval for the product feed watcher.
pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_secs(60);
/// Pause before each entity fetch within a tick.
pub const DEFAULT_PER_ITEM_DELAY: Duration = Duration::from_millis(500);
/// Pages fetched per feed scan at most.
pub const DEFAULT_MAX_FEED_PAGES: u32 = 50;
/// Extra credential exchanges allowed when a refresh is needed.
pub const DEFAULT_AUTH_RETRIES: u32 = 3;
/// Extra credential exchanges allowed at startup.
pub const DEFAULT_STARTUP_AUTH_RETRIES: u32 = 1;
/// Pause between credential exchange attempts.
pub const DEFAULT_AUTH_RETRY_DELAY: Duration = Duration::from_secs(3);
/// A credential with less remaining lifetime than this is refreshed.
pub const DEFAULT_MIN_TOKEN_VALIDITY: Duration = Duration::from_secs(30);

/// What a per-entity fetch failure does to the rest of the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// Log it and carry on with the next entity.
    #[default]
    Continue,
    /// Log it, report it to the sink, and end this tick's entity loop. The
    /// next tick starts normally.
    SkipRestOfTick,
}

/// Settings for [`crate::monitor::PollLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep at the start of every tick.
    pub interval: Duration,
    /// Sleep before every entity fetch.
    pub per_item_delay: Duration,
    pub fetch_error_policy: FetchErrorPolicy,
    /// Fetch every entity once before the first tick, dropping those already
    /// terminal and those that fail.
    pub prefetch_initial: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_GOAL_INTERVAL,
            per_item_delay: DEFAULT_PER_ITEM_DELAY,
            fetch_error_policy: FetchErrorPolicy::Continue,
            prefetch_initial: false,
        }
    }
}

/// Settings for [`crate::monitor::FeedWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Sleep before every scan.
    pub interval: Duration,
    /// Upper bound on pages fetched per scan; `None` pages until the stop
    /// condition is met.
    pub max_pages: Option<u32>,
    /// Report known items whose snapshot changed.
    pub notify_changed: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FEED_INTERVAL,
            max_pages: Some(DEFAULT_MAX_FEED_PAGES),
            notify_changed: false,
        }
    }
}

/// Settings for [`crate::auth::AuthSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Extra exchanges when refreshing during the run.
    pub retries: u32,
    /// Extra exchanges for the initial login.
    pub startup_retries: u32,
    pub retry_delay: Duration,
    pub min_validity: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_AUTH_RETRIES,
            startup_retries: DEFAULT_STARTUP_AUTH_RETRIES,
            retry_delay: DEFAULT_AUTH_RETRY_DELAY,
            min_validity: DEFAULT_MIN_TOKEN_VALIDITY,
        }
    }
}

/// `[poll]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSection {
    pub interval_secs: Option<u64>,
    pub per_item_delay_ms: Option<u64>,
    pub fetch_error_policy: Option<FetchErrorPolicy>,
}

/// `[feed]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSection {
    pub interval_secs: Option<u64>,
    pub max_pages: Option<u32>,
    pub notify_changed: Option<bool>,
}

/// `[auth]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    pub retries: Option<u32>,
    pub startup_retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub min_validity_secs: Option<u64>,
}

/// Optional configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll: PollSection,
    pub feed: FeedSection,
    pub auth: AuthSection,
    pub discord: Option<DiscordConfig>,
}

impl WatchConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Self::parse(&text).map_err(|e| {
                    crate::Error::config(format!("{}: {}", path.display(), e))
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::Error::config(e.to_string()))
    }

    /// Apply `[poll]` over `base`.
    pub fn poll_config(&self, base: PollConfig) -> PollConfig {
        PollConfig {
            interval: self
                .poll
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(base.interval),
            per_item_delay: self
                .poll
                .per_item_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.per_item_delay),
            fetch_error_policy: self
                .poll
                .fetch_error_policy
                .unwrap_or(base.fetch_error_policy),
            prefetch_initial: base.prefetch_initial,
        }
    }

    /// Apply `[feed]` over `base`.
    pub fn feed_config(&self, base: FeedConfig) -> FeedConfig {
        FeedConfig {
            interval: self
                .feed
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(base.interval),
            max_pages: self.feed.max_pages.or(base.max_pages),
            notify_changed: self.feed.notify_changed.unwrap_or(base.notify_changed),
        }
    }

    /// `[discord]` with command-line values applied on top.
    ///
    /// Returns `None` when neither source configures anything.
    pub fn discord_config(
        &self,
        bot_token: Option<String>,
        channel_id: Option<u64>,
        webhook_url: Option<String>,
    ) -> Option<DiscordConfig> {
        if self.discord.is_none()
            && bot_token.is_none()
            && channel_id.is_none()
            && webhook_url.is_none()
        {
            return None;
        }

        let mut discord = self.discord.clone().unwrap_or_default();
        if bot_token.is_some() {
            discord.bot_token = bot_token;
        }
        if channel_id.is_some() {
            discord.channel_id = channel_id;
        }
        if webhook_url.is_some() {
            discord.webhook_url = webhook_url;
        }
        Some(discord)
    }

    /// Apply `[auth]` over the defaults.
    pub fn auth_config(&self) -> AuthConfig {
        let base = AuthConfig::default();
        AuthConfig {
            retries: self.auth.retries.unwrap_or(base.retries),
            startup_retries: self.auth.startup_retries.unwrap_or(base.startup_retries),
            retry_delay: self
                .auth
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(base.retry_delay),
            min_validity: self
                .auth
                .min_validity_secs
                .map(Duration::from_secs)
                .unwrap_or(base.min_validity),
        }
    }
}
