//! Source adapters for pollwatch.
//!
//! - [`twitch`]: client-credentials login and Helix user lookups
//! - [`diverse`]: the diverse.direct product feed
//! - [`unity`]: Unity issue tracker pages

pub mod diverse;
pub mod twitch;
pub mod unity;
pub mod utils;

pub use diverse::{DiverseFeed, Product};
pub use twitch::{BroadcasterStatus, TwitchAuth, TwitchUsers};
pub use unity::{IssueStatus, UnityIssueTracker};
