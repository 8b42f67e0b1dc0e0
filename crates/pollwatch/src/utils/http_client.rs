use std::{sync::OnceLock, time::Duration};

use tracing::debug;

/// User agent sent by every watcher.
pub const USER_AGENT: &str = concat!("pollwatch/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for watcher HTTP clients.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Builder preconfigured with the watcher user agent and timeout.
pub fn client_builder(request_timeout: Duration) -> reqwest::ClientBuilder {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if request_timeout > Duration::ZERO {
        builder = builder.timeout(request_timeout);
    }
    builder
}

/// Build the shared HTTP client used by sources and channels.
pub fn build_client(request_timeout: Duration) -> crate::Result<reqwest::Client> {
    client_builder(request_timeout)
        .build()
        .map_err(|e| crate::Error::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Client with [`DEFAULT_REQUEST_TIMEOUT`].
pub fn default_client() -> crate::Result<reqwest::Client> {
    build_client(DEFAULT_REQUEST_TIMEOUT)
}
