use async_trait::async_trait;
use tracing::{info, warn};

use super::NotificationSink;
use crate::error::NotifyError;
use crate::notification::events::{Notification, NotificationKind};

/// Writes notifications to the log instead of an external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for ConsoleChannel {
    fn sink_type(&self) -> &'static str {
        "console"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let text = notification.plain_text();
        match notification.kind {
            NotificationKind::Error => warn!(entity = %notification.entity_id, "{}", text),
            kind => info!(entity = %notification.entity_id, kind = %kind, "{}", text),
        }
        Ok(())
    }
}
