//! Poll loop implementation.
//!
//! The [`PollLoop`] drives fetch → classify → notify → update for a fixed,
//! shrinking set of entities. Everything happens on one task, strictly in
//! sequence: entities are fetched one at a time with a pause in between to
//! respect upstream rate limits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::auth::{AuthSession, Credential};
use crate::config::{FetchErrorPolicy, PollConfig};
use crate::error::{FetchError, NotifyError};
use crate::notification::{Notification, NotificationKind, NotificationSink};
use crate::source::{Snapshot, SourceClient};

use super::detector::{ChangeDetector, Classification};
use super::store::WatchSet;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every tracked entity reached its terminal state.
    Completed,
    /// The cancellation token fired.
    Cancelled,
}

/// How a single tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// More ticks are needed.
    Continue,
    /// The watch set is empty.
    Completed,
    /// Cancellation was observed during the tick.
    Cancelled,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub fetches: u64,
    pub fetch_errors: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
}

/// Goal-oriented watcher over a fixed set of entities.
pub struct PollLoop<C: SourceClient> {
    source: C,
    detector: ChangeDetector<C::Snapshot>,
    sink: Arc<dyn NotificationSink>,
    auth: Option<AuthSession>,
    config: PollConfig,
    cancellation: CancellationToken,
    watch_set: WatchSet<C::Snapshot>,
    stats: PollStats,
}

impl<C: SourceClient> PollLoop<C> {
    /// Create a new poll loop.
    pub fn new(
        source: C,
        detector: ChangeDetector<C::Snapshot>,
        sink: Arc<dyn NotificationSink>,
        config: PollConfig,
    ) -> Self {
        Self {
            source,
            detector,
            sink,
            auth: None,
            config,
            cancellation: CancellationToken::new(),
            watch_set: WatchSet::new(),
            stats: PollStats::default(),
        }
    }

    /// Authenticate requests with `session`, refreshing it before every tick.
    pub fn with_auth(mut self, session: AuthSession) -> Self {
        self.auth = Some(session);
        self
    }

    /// Stop the loop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn watch_set(&self) -> &WatchSet<C::Snapshot> {
        &self.watch_set
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Watch `initial` until every entity is terminal or the loop is cancelled.
    ///
    /// Fails only when authentication cannot be restored.
    pub async fn run<I, T>(&mut self, initial: I) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        if self.seed(initial).await? == TickOutcome::Cancelled {
            return Ok(RunOutcome::Cancelled);
        }

        loop {
            if self.cancellation.is_cancelled() {
                info!("Poll loop cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            if self.watch_set.is_empty() {
                info!("Nothing left to watch");
                return Ok(RunOutcome::Completed);
            }
            if !self.pause(self.config.interval).await {
                info!("Poll loop cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            match self.tick().await? {
                TickOutcome::Continue => {}
                TickOutcome::Completed => {
                    info!("All watched entities reached their final state");
                    return Ok(RunOutcome::Completed);
                }
                TickOutcome::Cancelled => {
                    info!("Poll loop cancelled");
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }
    }

    /// Track the initial ids, dropping duplicates.
    ///
    /// With `prefetch_initial`, every id is fetched once: those that fail are
    /// dropped, those already terminal are retired without a notification, and
    /// the rest start with their first snapshot.
    pub async fn seed<I, T>(&mut self, initial: I) -> Result<TickOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for id in initial {
            let id = id.into();
            if !self.watch_set.track(id.as_str()) {
                debug!(entity = %id, "Duplicate id ignored");
            }
        }

        if !self.config.prefetch_initial {
            info!(
                source = self.source.kind(),
                "Watching {} entities",
                self.watch_set.len()
            );
            return Ok(TickOutcome::Continue);
        }

        let credential = self.credential().await?;
        for id in self.watch_set.keys() {
            if !self.pause(self.config.per_item_delay).await {
                return Ok(TickOutcome::Cancelled);
            }

            match self.source.fetch(&id, credential.as_ref()).await {
                Ok(snapshot) => {
                    self.stats.fetches += 1;
                    info!(entity = %id, "{}", snapshot.summary());
                    if self.detector.is_terminal(&snapshot) {
                        info!(entity = %id, "Already in a final state, not watching");
                        self.watch_set.retire(id);
                    } else {
                        self.watch_set.put(id, snapshot);
                    }
                }
                Err(e) => {
                    self.stats.fetch_errors += 1;
                    error!(entity = %id, error = ?e, "Initial fetch failed, not watching");
                    self.watch_set.remove(&id);
                }
            }
        }

        info!(
            source = self.source.kind(),
            "Watching {} entities",
            self.watch_set.len()
        );
        Ok(if self.watch_set.is_empty() {
            TickOutcome::Completed
        } else {
            TickOutcome::Continue
        })
    }

    /// One pass over the current watch set, without the leading interval.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        let credential = self.credential().await?;

        for id in self.watch_set.keys() {
            if !self.pause(self.config.per_item_delay).await {
                return Ok(TickOutcome::Cancelled);
            }

            debug!(entity = %id, "Checking");
            match self.check_entity(&id, credential.as_ref()).await {
                Ok(_) => {
                    if self.watch_set.is_empty() {
                        return Ok(TickOutcome::Completed);
                    }
                }
                Err(e) => {
                    self.stats.fetch_errors += 1;
                    match self.config.fetch_error_policy {
                        FetchErrorPolicy::Continue => {
                            warn!(entity = %id, error = ?e, "Fetch failed");
                        }
                        FetchErrorPolicy::SkipRestOfTick => {
                            let message = format!(
                                "Checking {} failed, skipping the rest of this round: {}",
                                id, e
                            );
                            error!(entity = %id, error = ?e, "{}", message);
                            self.deliver(Notification::error(id.as_str(), message)).await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(TickOutcome::Continue)
    }

    /// Fetch, classify, notify and record one entity.
    async fn check_entity(
        &mut self,
        id: &str,
        credential: Option<&Credential>,
    ) -> std::result::Result<Classification, FetchError> {
        let snapshot = self.source.fetch(id, credential).await?;
        self.stats.fetches += 1;

        let classification = self.detector.classify(self.watch_set.get(id), &snapshot);
        info!(
            entity = %id,
            result = %classification,
            "{}",
            snapshot.summary()
        );

        if self.detector.should_notify(classification) {
            if let Some(kind) = NotificationKind::from_classification(classification) {
                self.deliver(snapshot.to_notification(id, kind)).await;
            }
        }

        if classification.is_terminal() {
            self.watch_set.remove(id);
            info!(
                entity = %id,
                "Final state reached, {} entities left",
                self.watch_set.len()
            );
        } else {
            self.watch_set.put(id, snapshot);
        }

        Ok(classification)
    }

    /// Deliver best-effort; failures are logged and counted only.
    async fn deliver(&mut self, notification: Notification) {
        match self.sink.deliver(&notification).await {
            Ok(()) => self.stats.notifications_sent += 1,
            Err(e) => {
                self.stats.notification_failures += 1;
                warn!(
                    sink = self.sink.sink_type(),
                    entity = %notification.entity_id,
                    error = ?e,
                    "Notification delivery failed"
                );
                report_delivery_failure(self.sink.as_ref(), &notification, &e).await;
            }
        }
    }

    async fn credential(&mut self) -> Result<Option<Credential>> {
        match self.auth.as_mut() {
            Some(session) => Ok(Some(session.ensure_valid().await?)),
            None => Ok(None),
        }
    }

    /// Sleep for `duration` unless cancelled. Returns `false` on cancellation.
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

/// Tell the operator through the sink itself that a delivery failed.
///
/// Error reports are never reported again.
pub(crate) async fn report_delivery_failure(
    sink: &dyn NotificationSink,
    notification: &Notification,
    error: &NotifyError,
) {
    if notification.kind == NotificationKind::Error {
        return;
    }
    let report = Notification::error(
        notification.entity_id.as_str(),
        format!(
            "Failed to deliver {} notification for {}: {}",
            notification.kind, notification.entity_id, error
        ),
    );
    if let Err(e) = sink.deliver(&report).await {
        debug!(error = ?e, "Failure report not delivered either");
    }
}
