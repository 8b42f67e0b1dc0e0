//! Feed scanner.
//!
//! Unlike the [`PollLoop`](super::PollLoop), a feed watcher has no fixed entity
//! list: it pages through a newest-first feed and announces every item it has
//! not seen before. Paging stops at the first page that contains a known item,
//! at an empty page, at a page with nothing unseen in this scan, or at the
//! configured page limit.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::notification::{Notification, NotificationKind, NotificationSink};
use crate::source::{FeedSource, Snapshot};

use super::detector::ChangeDetector;
use super::service::{RunOutcome, report_delivery_failure};
use super::store::WatchSet;

/// Result of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Pages requested, including the one that ended the scan.
    pub pages: u32,
    /// Items seen for the first time.
    pub new_items: usize,
    /// Known items whose snapshot changed.
    pub changed_items: usize,
}

/// Watches a paginated feed for new items.
pub struct FeedWatcher<F: FeedSource> {
    source: F,
    detector: ChangeDetector<F::Snapshot>,
    sink: Arc<dyn NotificationSink>,
    config: FeedConfig,
    cancellation: CancellationToken,
    known: WatchSet<F::Snapshot>,
}

impl<F: FeedSource> FeedWatcher<F> {
    pub fn new(source: F, sink: Arc<dyn NotificationSink>, config: FeedConfig) -> Self {
        let detector = ChangeDetector::feed().with_notify_changed(config.notify_changed);
        Self {
            source,
            detector,
            sink,
            config,
            cancellation: CancellationToken::new(),
            known: WatchSet::new(),
        }
    }

    /// Stop the watcher when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Items seen so far and their last snapshot.
    pub fn known(&self) -> &WatchSet<F::Snapshot> {
        &self.known
    }

    /// Mark the current first page as seen, except for its `skip` newest
    /// items, which the first scan will then announce.
    ///
    /// Returns how many items were marked.
    pub async fn seed(&mut self, skip: usize) -> std::result::Result<usize, FetchError> {
        let items = self.source.fetch_page(1).await?;
        let mut marked = 0;
        for (id, snapshot) in items.into_iter().skip(skip) {
            if !self.known.contains(&id) {
                marked += 1;
            }
            self.known.put(id, snapshot);
        }
        info!(
            source = self.source.kind(),
            skip, "Marked {} items from the first page as seen", marked
        );
        Ok(marked)
    }

    /// Page through the feed once and announce what is new.
    ///
    /// A failing page abandons the scan before anything is recorded.
    pub async fn scan(&mut self) -> std::result::Result<ScanReport, FetchError> {
        let mut report = ScanReport::default();
        let mut discovered: Vec<(String, F::Snapshot)> = Vec::new();
        let mut revisited: Vec<(String, F::Snapshot)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut page = 1;
        loop {
            let items = self.source.fetch_page(page).await?;
            report.pages = page;
            if items.is_empty() {
                debug!(page, "Reached the end of the feed");
                break;
            }

            let mut reached_known = false;
            let mut unseen = 0;
            for (id, snapshot) in items {
                if !seen.insert(id.clone()) {
                    continue;
                }
                unseen += 1;
                if self.known.contains(&id) {
                    reached_known = true;
                    if self.config.notify_changed {
                        revisited.push((id, snapshot));
                    }
                } else {
                    discovered.push((id, snapshot));
                }
            }

            if reached_known {
                break;
            }
            if unseen == 0 {
                debug!(page, "Page repeats items already seen in this scan");
                break;
            }
            if self.config.max_pages.is_some_and(|max| page >= max) {
                debug!(page, "Page limit reached");
                break;
            }
            page += 1;
        }

        for (id, snapshot) in discovered {
            let classification = self.detector.classify(None, &snapshot);
            info!(entity = %id, "{}", snapshot.summary());
            if self.detector.should_notify(classification) {
                self.deliver(snapshot.to_notification(&id, NotificationKind::New))
                    .await;
            }
            self.known.put(id, snapshot);
            report.new_items += 1;
        }

        for (id, snapshot) in revisited {
            let classification = self.detector.classify(self.known.get(&id), &snapshot);
            if !self.detector.should_notify(classification) {
                continue;
            }
            if let Some(kind) = NotificationKind::from_classification(classification) {
                info!(entity = %id, result = %classification, "{}", snapshot.summary());
                self.deliver(snapshot.to_notification(&id, kind)).await;
                report.changed_items += 1;
            }
            self.known.put(id, snapshot);
        }

        Ok(report)
    }

    /// Seed, then scan every `interval` until cancelled.
    pub async fn run(&mut self, skip: usize) -> Result<RunOutcome> {
        self.seed(skip).await?;

        loop {
            if !self.pause(self.config.interval).await {
                info!("Feed watcher cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            match self.scan().await {
                Ok(report) if report.new_items > 0 || report.changed_items > 0 => {
                    info!(
                        pages = report.pages,
                        changed = report.changed_items,
                        "Found {} new items",
                        report.new_items
                    );
                }
                Ok(report) => debug!(pages = report.pages, "Nothing new"),
                Err(e) => warn!(source = self.source.kind(), error = ?e, "Feed scan failed"),
            }
        }
    }

    async fn deliver(&self, notification: Notification) {
        if let Err(e) = self.sink.deliver(&notification).await {
            warn!(
                sink = self.sink.sink_type(),
                entity = %notification.entity_id,
                error = ?e,
                "Notification delivery failed"
            );
            report_delivery_failure(self.sink.as_ref(), &notification, &e).await;
        }
    }

    async fn pause(&self, duration: Duration) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.cancellation.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
