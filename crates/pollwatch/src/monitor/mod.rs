//! Watch loops.
//!
//! - [`PollLoop`]: re-fetches a fixed set of entities until each one reaches
//!   its final state
//! - [`FeedWatcher`]: pages through a newest-first feed and reports new items
//! - [`ChangeDetector`]: classifies a fresh snapshot against the previous one
//! - [`WatchSet`]: the tracked entities and their last snapshot

mod detector;
mod feed;
mod service;
mod store;

pub use detector::{ChangeDetector, Classification};
pub use feed::{FeedWatcher, ScanReport};
pub use service::{PollLoop, PollStats, RunOutcome, TickOutcome};
pub use store::WatchSet;
