//! Twitch: app access tokens and broadcaster type lookups.

mod auth;
pub mod models;
mod users;

pub use auth::TwitchAuth;
pub use users::TwitchUsers;

use pollwatch::notification::{Notification, NotificationKind};
use pollwatch::source::Snapshot;
use serde::{Deserialize, Serialize};

use crate::utils::non_blank;
use models::HelixUser;

const CHANNEL_URL: &str = "https://www.twitch.tv";

/// Broadcaster type of one Twitch user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcasterStatus {
    pub login: String,
    pub display_name: String,
    pub broadcaster_type: String,
    pub profile_image_url: String,
}

impl BroadcasterStatus {
    /// Affiliate or partner.
    pub fn has_broadcaster_type(&self) -> bool {
        non_blank(&self.broadcaster_type).is_some()
    }
}

impl From<HelixUser> for BroadcasterStatus {
    fn from(user: HelixUser) -> Self {
        Self {
            login: user.login,
            display_name: user.display_name,
            broadcaster_type: user.broadcaster_type,
            profile_image_url: user.profile_image_url,
        }
    }
}

impl Snapshot for BroadcasterStatus {
    fn to_notification(&self, entity_id: &str, kind: NotificationKind) -> Notification {
        let title = match non_blank(&self.broadcaster_type) {
            Some(broadcaster_type) => format!("Broadcaster type is now [{}]", broadcaster_type),
            None => format!("{} has no broadcaster type", self.display_name),
        };
        let mut notification = Notification::new(kind, entity_id, title)
            .with_url(format!("{}/{}", CHANNEL_URL, self.login))
            .with_author(self.display_name.clone());
        if let Some(image) = non_blank(&self.profile_image_url) {
            notification = notification.with_image(image);
        }
        notification
    }

    fn summary(&self) -> String {
        match non_blank(&self.broadcaster_type) {
            Some(broadcaster_type) => broadcaster_type.to_string(),
            None => "No dice".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(broadcaster_type: &str) -> BroadcasterStatus {
        BroadcasterStatus {
            login: "twitchdev".to_string(),
            display_name: "TwitchDev".to_string(),
            broadcaster_type: broadcaster_type.to_string(),
            profile_image_url: String::new(),
        }
    }

    #[test]
    fn test_blank_broadcaster_type_is_not_terminal() {
        assert!(!status("").has_broadcaster_type());
        assert!(!status("  ").has_broadcaster_type());
        assert!(status("affiliate").has_broadcaster_type());
    }

    #[test]
    fn test_terminal_notification() {
        let n = status("partner").to_notification("twitchdev", NotificationKind::Terminal);
        assert_eq!(n.title, "Broadcaster type is now [partner]");
        assert_eq!(n.url.as_deref(), Some("https://www.twitch.tv/twitchdev"));
        assert!(n.image_url.is_none());
    }
}
