use std::time::Duration;

use krishimitr_core::errors::{ProviderError, ProviderKind};
use reqwest::Client;

pub(crate) fn build_client(provider: ProviderKind, timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| ProviderError::Client { provider, message: error.to_string() })
}

/// Drops the URL from the error first: provider keys may travel in the query.
pub(crate) fn transport_error(
    provider: ProviderKind,
    timeout_secs: u64,
    error: reqwest::Error,
) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout { provider, timeout_secs };
    }
    ProviderError::Request { provider, message: error.without_url().to_string() }
}

/// Short excerpt of an error body for logs.
pub(crate) fn body_excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}
