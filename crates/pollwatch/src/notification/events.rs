//! Notification payloads.
//!
//! A [`Notification`] is what a snapshot renders into once the detector decides
//! a change is worth reporting. Channels only ever see this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::Classification;

/// What kind of change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A previously unseen entity appeared.
    New,
    /// A tracked entity changed.
    Changed,
    /// A tracked entity reached its stopping condition.
    Terminal,
    /// The watcher itself hit a problem the operator should see.
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Terminal => "terminal",
            Self::Error => "error",
        }
    }

    /// Map a detector classification to the notification it produces.
    ///
    /// `Unchanged` never produces one.
    pub fn from_classification(classification: Classification) -> Option<Self> {
        match classification {
            Classification::New => Some(Self::New),
            Classification::Changed => Some(Self::Changed),
            Classification::Terminal => Some(Self::Terminal),
            Classification::Unchanged => None,
        }
    }

    /// Default priority for this kind of notification.
    pub fn default_priority(&self) -> NotificationPriority {
        match self {
            Self::New => NotificationPriority::Normal,
            Self::Changed => NotificationPriority::Normal,
            Self::Terminal => NotificationPriority::High,
            Self::Error => NotificationPriority::Critical,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority level for notifications.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Low priority - informational only.
    Low,
    /// Normal priority - standard notifications.
    #[default]
    Normal,
    /// High priority - important events.
    High,
    /// Critical priority - requires immediate attention.
    Critical,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A named value shown alongside the notification body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Identifier of the entity this is about (empty for watcher-level errors).
    pub entity_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<NotificationField>,
    pub priority: NotificationPriority,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Start a notification with the kind's default priority.
    pub fn new(kind: NotificationKind, entity_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            title: title.into(),
            description: None,
            url: None,
            image_url: None,
            author: None,
            fields: Vec::new(),
            priority: kind.default_priority(),
            timestamp: Utc::now(),
        }
    }

    /// Error report for the operator, e.g. a fetch failure that cut a tick short.
    pub fn error(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, entity_id, "Watcher error").with_description(message)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(NotificationField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Plain-text rendering for channels without rich formatting.
    pub fn plain_text(&self) -> String {
        let mut text = self.title.clone();
        if let Some(description) = &self.description {
            text.push('\n');
            text.push_str(description);
        }
        for field in &self.fields {
            text.push_str(&format!("\n{}: {}", field.name, field.value));
        }
        if let Some(url) = &self.url {
            text.push('\n');
            text.push_str(url);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_classification() {
        assert_eq!(
            NotificationKind::from_classification(Classification::New),
            Some(NotificationKind::New)
        );
        assert_eq!(
            NotificationKind::from_classification(Classification::Terminal),
            Some(NotificationKind::Terminal)
        );
        assert_eq!(
            NotificationKind::from_classification(Classification::Unchanged),
            None
        );
    }

    #[test]
    fn test_error_notification_is_critical() {
        let n = Notification::error("someone", "boom");
        assert_eq!(n.kind, NotificationKind::Error);
        assert_eq!(n.priority, NotificationPriority::Critical);
        assert_eq!(n.description.as_deref(), Some("boom"));
    }

    #[test]
    fn test_plain_text() {
        let n = Notification::new(NotificationKind::New, "1", "Title")
            .with_field("Price", "100")
            .with_url("https://example.com/1");
        assert_eq!(n.plain_text(), "Title\nPrice: 100\nhttps://example.com/1");
    }
}
