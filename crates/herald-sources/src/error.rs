//! Error types for stream-platform clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned status {status}")]
    Http { status: u16 },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    /// Transient errors clear on their own; the next cycle retries
    /// naturally. Permanent ones (bad credentials, shape drift) need a
    /// config or code fix.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Http { status } => *status == 429 || *status >= 500,
            Self::Auth(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(SourceError::Http { status: 429 }.is_transient());
        assert!(SourceError::Http { status: 503 }.is_transient());
        assert!(SourceError::Timeout.is_transient());
        assert!(SourceError::Network("reset".into()).is_transient());
    }

    #[test]
    fn auth_and_shape_errors_are_permanent() {
        assert!(!SourceError::Auth("bad token".into()).is_transient());
        assert!(!SourceError::InvalidResponse("missing field".into()).is_transient());
        assert!(!SourceError::Http { status: 404 }.is_transient());
    }
}
