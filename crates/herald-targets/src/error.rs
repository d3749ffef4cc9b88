//! Error types for social posting clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("target returned status {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("credentials rejected: {0}")]
    Auth(String),

    #[error("target misconfigured: {0}")]
    Config(String),

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

impl TargetError {
    /// Permanent errors disable posting to the target until its
    /// configuration is fixed; transient ones go through the retry
    /// policy.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Config(_) => true,
            Self::Http { status, .. } => *status != 429 && (400..500).contains(status),
            Self::Timeout | Self::Network(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for TargetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
