//! Notification delivery.
//!
//! Watchers hand rendered [`Notification`]s to a [`NotificationSink`]. Delivery
//! is best-effort: a failed send is logged by the caller and never holds back
//! state progression.
//!
//! # Example
//!
//! ```ignore
//! use pollwatch::notification::{DiscordChannel, DiscordConfig};
//!
//! let channel = DiscordChannel::new(DiscordConfig {
//!     bot_token: Some(token),
//!     channel_id: Some(channel_id),
//!     ..Default::default()
//! })?;
//! channel.verify().await?;
//! ```

pub mod channels;
pub mod events;

pub use channels::{
    ConsoleChannel, DiscordChannel, DiscordConfig, DiscordTarget, NotificationSink, connect_sink,
};
pub use events::{Notification, NotificationField, NotificationKind, NotificationPriority};
