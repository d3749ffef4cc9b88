//! herald-sources: stream-platform status clients.
//!
//! One adapter per platform behind the [`StreamClient`] capability
//! trait. The orchestration core never branches on platform identity
//! except to select the adapter here.

pub mod error;
pub mod kick;
pub mod twitch;
pub mod youtube;

use std::sync::Arc;

use async_trait::async_trait;

use herald_core::config::PlatformAuthConfig;
use herald_core::types::{LiveSnapshot, Source, StreamPlatform};

pub use error::SourceError;

/// Capability interface for querying one stream source's current status.
///
/// Implementations must be safely callable concurrently; any error is
/// treated by the core as "no transition this cycle" for that source.
#[async_trait]
pub trait StreamClient: Send + Sync {
    async fn poll(&self, source: &Source) -> Result<LiveSnapshot, SourceError>;
}

/// Build the adapter for a platform from the shared HTTP client and the
/// configured credentials.
///
/// Returns `None` when the platform needs credentials that are not
/// configured; config validation rejects that combination up front, so
/// a `None` here means the caller skipped validation.
pub fn client_for(
    platform: StreamPlatform,
    http: reqwest::Client,
    auth: &PlatformAuthConfig,
) -> Option<Arc<dyn StreamClient>> {
    match platform {
        StreamPlatform::Twitch => auth
            .twitch
            .as_ref()
            .map(|a| Arc::new(twitch::TwitchClient::new(http, a.clone())) as Arc<dyn StreamClient>),
        StreamPlatform::Youtube => auth
            .youtube
            .as_ref()
            .map(|a| Arc::new(youtube::YoutubeClient::new(http, a.clone())) as Arc<dyn StreamClient>),
        StreamPlatform::Kick => Some(Arc::new(kick::KickClient::new(http))),
        // StreamPlatform is #[non_exhaustive]; no adapter for future variants yet.
        _ => None,
    }
}
