//! Credential lifecycle.
//!
//! Logs in once at startup, then checks the credential before every tick and
//! exchanges a new one when it expired, was revoked, or is about to expire.
//! Exchanges are retried a bounded number of times before giving up.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Authenticator, Credential};
use crate::config::AuthConfig;
use crate::error::AuthError;

/// Owns the current credential and keeps it usable.
///
/// Only the poll loop holds a session, so refreshes never race.
pub struct AuthSession {
    authenticator: Arc<dyn Authenticator>,
    config: AuthConfig,
    credential: Option<Credential>,
}

impl AuthSession {
    pub fn new(authenticator: Arc<dyn Authenticator>, config: AuthConfig) -> Self {
        Self {
            authenticator,
            config,
            credential: None,
        }
    }

    /// The credential from the last successful login, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Initial login, using `preexisting` instead of an exchange when given.
    pub async fn start(&mut self, preexisting: Option<Credential>) -> Result<Credential, AuthError> {
        let retries = self.config.startup_retries;
        self.login(preexisting, retries).await
    }

    /// Make sure the current credential has enough lifetime left, logging in
    /// again with the configured retries if it does not.
    pub async fn ensure_valid(&mut self) -> Result<Credential, AuthError> {
        if let Some(credential) = self.credential.clone() {
            if self.check(&credential).await {
                return Ok(credential);
            }
        }

        info!(
            platform = self.authenticator.platform_id(),
            "Credential invalid or expiring, refreshing"
        );
        let retries = self.config.retries;
        self.login(None, retries).await
    }

    /// Obtain a credential and validate it, exchanging again up to `retries`
    /// more times with `retry_delay` between attempts.
    pub async fn login(
        &mut self,
        preexisting: Option<Credential>,
        retries: u32,
    ) -> Result<Credential, AuthError> {
        let mut candidate = match preexisting {
            Some(credential) => Some(credential),
            None => self.exchange().await,
        };
        let mut valid = match &candidate {
            Some(credential) => self.check(credential).await,
            None => false,
        };

        let mut attempt = 0;
        while !valid && attempt < retries {
            attempt += 1;
            debug!(
                platform = self.authenticator.platform_id(),
                attempt, retries, "Retrying login in {:?}", self.config.retry_delay
            );
            sleep(self.config.retry_delay).await;

            candidate = self.exchange().await;
            valid = match &candidate {
                Some(credential) => self.check(credential).await,
                None => false,
            };
        }

        match candidate {
            Some(credential) if valid => {
                debug!(platform = self.authenticator.platform_id(), "Login ok");
                self.credential = Some(credential.clone());
                Ok(credential)
            }
            _ => {
                self.credential = None;
                Err(AuthError::RetriesExhausted { retries })
            }
        }
    }

    async fn exchange(&self) -> Option<Credential> {
        match self.authenticator.exchange().await {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(
                    platform = self.authenticator.platform_id(),
                    error = %e,
                    "Credential exchange failed"
                );
                None
            }
        }
    }

    async fn check(&self, credential: &Credential) -> bool {
        match self.authenticator.validate(credential).await {
            Ok(remaining) if remaining >= self.config.min_validity => true,
            Ok(remaining) => {
                let e = AuthError::Expired {
                    remaining_secs: remaining.as_secs(),
                    required_secs: self.config.min_validity.as_secs(),
                };
                debug!(platform = self.authenticator.platform_id(), "{}", e);
                false
            }
            Err(e) => {
                warn!(
                    platform = self.authenticator.platform_id(),
                    error = %e,
                    "Credential validation failed"
                );
                false
            }
        }
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
