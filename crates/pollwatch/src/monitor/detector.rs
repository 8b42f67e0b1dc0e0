//! Change classification.
//!
//! The detector compares a fresh snapshot against the previous one and decides
//! whether anything happened. It has no state of its own beyond the watcher's
//! terminal predicate and notification policy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Outcome of comparing two snapshots of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// No previous snapshot existed.
    New,
    /// Structurally equal to the previous snapshot.
    Unchanged,
    /// Differs from the previous snapshot.
    Changed,
    /// Satisfies the watcher's stopping condition.
    Terminal,
}

impl Classification {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Classification::Terminal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "new",
            Classification::Unchanged => "unchanged",
            Classification::Changed => "changed",
            Classification::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type TerminalPredicate<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Classifies fresh snapshots and decides which classifications are reported.
pub struct ChangeDetector<S> {
    terminal: TerminalPredicate<S>,
    notify_new: bool,
    notify_changed: bool,
}

impl<S> Clone for ChangeDetector<S> {
    fn clone(&self) -> Self {
        Self {
            terminal: self.terminal.clone(),
            notify_new: self.notify_new,
            notify_changed: self.notify_changed,
        }
    }
}

impl<S> fmt::Debug for ChangeDetector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("notify_new", &self.notify_new)
            .field("notify_changed", &self.notify_changed)
            .finish_non_exhaustive()
    }
}

impl<S: PartialEq> ChangeDetector<S> {
    /// Detector for a goal-oriented watcher that stops tracking an entity once
    /// `terminal` holds for it.
    pub fn new(terminal: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        Self {
            terminal: Arc::new(terminal),
            notify_new: false,
            notify_changed: true,
        }
    }

    /// Detector for feed-style watchers: nothing is ever terminal and new
    /// entities are reported.
    pub fn feed() -> Self {
        Self::new(|_| false).with_notify_new(true).with_notify_changed(false)
    }

    /// Whether a first observation is reported.
    pub fn with_notify_new(mut self, notify_new: bool) -> Self {
        self.notify_new = notify_new;
        self
    }

    /// Whether a change that is not terminal is reported.
    pub fn with_notify_changed(mut self, notify_changed: bool) -> Self {
        self.notify_changed = notify_changed;
        self
    }

    /// Whether `snapshot` meets the stopping condition.
    pub fn is_terminal(&self, snapshot: &S) -> bool {
        (self.terminal)(snapshot)
    }

    /// Classify `current` against the previously recorded snapshot.
    ///
    /// Pure: the same inputs always give the same answer.
    pub fn classify(&self, previous: Option<&S>, current: &S) -> Classification {
        match previous {
            Some(previous) if previous == current => Classification::Unchanged,
            _ if self.is_terminal(current) => Classification::Terminal,
            None => Classification::New,
            Some(_) => Classification::Changed,
        }
    }

    /// Whether `classification` should produce a notification.
    pub fn should_notify(&self, classification: Classification) -> bool {
        match classification {
            Classification::Terminal => true,
            Classification::Changed => self.notify_changed,
            Classification::New => self.notify_new,
            Classification::Unchanged => false,
        }
    }
}
