//! Bearer credential handling for watchers that authenticate.
//!
//! - [`Credential`]: a bearer token with an optional expiry
//! - [`Authenticator`]: the upstream exchange/validation endpoints
//! - [`AuthSession`]: owns the current credential and refreshes it with a
//!   bounded number of retries

mod session;

pub use session::AuthSession;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuthError;

/// A bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Credential with unknown expiry, e.g. one supplied by the operator.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Credential expiring `expires_in` from now.
    pub fn expiring_in(access_token: impl Into<String>, expires_in: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(expires_in)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Remaining lifetime according to the locally known expiry.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Upstream credential endpoints.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Platform identifier used in logs.
    fn platform_id(&self) -> &'static str;

    /// Exchange the configured client id/secret for a fresh credential.
    async fn exchange(&self) -> Result<Credential, AuthError>;

    /// Ask the upstream how long `credential` remains valid.
    async fn validate(&self, credential: &Credential) -> Result<Duration, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("super-secret");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_credential_remaining() {
        assert_eq!(Credential::new("t").remaining(), None);

        let credential = Credential::expiring_in("t", Duration::from_secs(3600));
        let remaining = credential.remaining().unwrap();
        assert!(remaining > Duration::from_secs(3500));
        assert!(remaining <= Duration::from_secs(3600));
        assert_eq!(credential.bearer(), "Bearer t");
    }
}
