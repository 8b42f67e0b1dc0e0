//! Notification channels.
//!
//! - Discord (bot token + channel id, or webhook)
//! - Console (tracing output, used when nothing else is configured)

mod console;
mod discord;

pub use console::ConsoleChannel;
pub use discord::{DiscordChannel, DiscordConfig, DiscordTarget};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::events::Notification;
use crate::error::NotifyError;

/// Somewhere notifications can be delivered.
///
/// Delivery is best-effort: callers log failures and move on, so
/// implementations should not retry indefinitely.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Get the sink type name.
    fn sink_type(&self) -> &'static str;

    /// Deliver a notification.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Build the sink for a watcher.
///
/// A configured Discord target is verified before use and an unreachable one
/// is an error. Without a target, notifications go to the console.
pub async fn connect_sink(
    discord: Option<DiscordConfig>,
    client: Client,
) -> crate::Result<Arc<dyn NotificationSink>> {
    let channel = discord.map(|config| DiscordChannel::with_client(config, client));
    match channel {
        Some(channel) if channel.is_enabled() => {
            channel.verify().await?;
            Ok(Arc::new(channel))
        }
        _ => {
            info!("No Discord target configured, notifications go to the console");
            Ok(Arc::new(ConsoleChannel::new()))
        }
    }
}
