//! pollwatch: watch remote entities by polling and report what changed.
//!
//! Two watcher shapes are provided:
//! - [`monitor::PollLoop`] re-fetches a fixed set of entities until each one
//!   reaches its final state, then stops
//! - [`monitor::FeedWatcher`] pages through a newest-first feed forever and
//!   reports every item it has not seen before
//!
//! Upstream systems plug in through [`source::SourceClient`] and
//! [`source::FeedSource`]; notifications leave through
//! [`notification::NotificationSink`].

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod source;
pub mod utils;

pub use error::{Error, Result};
pub use source::{FeedSource, Snapshot, SourceClient};
