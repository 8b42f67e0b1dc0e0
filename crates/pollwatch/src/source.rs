//! Source adapters consumed by the poll loop and the feed watcher.
//!
//! Implementations must be safe to call repeatedly: they only read from the
//! upstream system.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::auth::Credential;
use crate::error::FetchError;
use crate::notification::{Notification, NotificationKind};

/// Classification-relevant state of one entity at one fetch.
///
/// Equality must be structural over every tracked attribute. Snapshots are
/// never mutated; each fetch produces a new one.
pub trait Snapshot: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Render the snapshot into a notification of the given kind.
    fn to_notification(&self, entity_id: &str, kind: NotificationKind) -> Notification;

    /// Short human-readable summary for log lines.
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// Fetches the current state of a single tracked entity.
#[async_trait]
pub trait SourceClient: Send + Sync {
    type Snapshot: Snapshot;

    /// Name of the upstream, used in logs.
    fn kind(&self) -> &'static str;

    /// Fetch a fresh snapshot of `id`.
    ///
    /// `credential` is the loop-owned bearer credential, if the watcher
    /// authenticates.
    async fn fetch(
        &self,
        id: &str,
        credential: Option<&Credential>,
    ) -> Result<Self::Snapshot, FetchError>;
}

/// Fetches pages of a feed whose set of entities grows over time.
#[async_trait]
pub trait FeedSource: Send + Sync {
    type Snapshot: Snapshot;

    /// Name of the upstream, used in logs.
    fn kind(&self) -> &'static str;

    /// Fetch a 1-based page, ordered newest first. An empty page means the end
    /// of the feed.
    async fn fetch_page(&self, page: u32) -> Result<Vec<(String, Self::Snapshot)>, FetchError>;
}
