use std::fmt;

use thiserror::Error;

use crate::messages;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    MarketData,
    Generative,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::Generative => "generative",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an outbound capability. Always recoverable: the dispatcher turns
/// it into a fixed apology and carries on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} credentials are not configured")]
    MissingCredentials { provider: ProviderKind },
    #[error("{provider} client could not be constructed: {message}")]
    Client { provider: ProviderKind, message: String },
    #[error("{provider} request failed: {message}")]
    Request { provider: ProviderKind, message: String },
    #[error("{provider} responded with HTTP {status}")]
    Status { provider: ProviderKind, status: u16 },
    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: ProviderKind, message: String },
    #[error("{provider} did not respond within {timeout_secs}s")]
    Timeout { provider: ProviderKind, timeout_secs: u64 },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::MissingCredentials { provider }
            | Self::Client { provider, .. }
            | Self::Request { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Timeout { provider, .. } => *provider,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::Client { .. } => "client_construction",
            Self::Request { .. } => "request",
            Self::Status { .. } => "http_status",
            Self::Decode { .. } => "decode",
            Self::Timeout { .. } => "timeout",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.provider() {
            ProviderKind::MarketData => messages::PRICE_UNAVAILABLE,
            ProviderKind::Generative => messages::GENERATION_FAILED,
        }
    }
}
