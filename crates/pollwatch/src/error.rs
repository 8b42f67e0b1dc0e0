//! Error types.
//!
//! Fetch and notification failures are recovered inside the poll loop; only
//! [`AuthError`] (after its retries) and configuration problems reach callers.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Credential exchange or validation failure.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The client id/secret exchange was rejected or malformed.
    #[error("credential exchange failed: {0}")]
    Exchange(String),

    /// The validation endpoint rejected the credential.
    #[error("credential validation failed: {0}")]
    Validation(String),

    /// The credential is valid but has too little lifetime left.
    #[error("credential expires in {remaining_secs}s (need at least {required_secs}s)")]
    Expired {
        remaining_secs: u64,
        required_secs: u64,
    },

    /// Login kept failing after every allowed attempt.
    #[error("login failed after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Upstream fetch failure for one entity or one feed page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload was readable but lacked what classification needs.
    #[error("cannot classify: {0}")]
    Classification(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Whether the failure came from the payload rather than the transport.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Classification(_))
    }
}

/// Notification delivery failure. Never fatal to a poll loop.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected with {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("channel is disabled")]
    Disabled,

    #[error("{0}")]
    Other(String),
}
