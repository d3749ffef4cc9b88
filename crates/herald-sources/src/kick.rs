//! Kick public channel-status client. No credentials required.

use async_trait::async_trait;
use serde::Deserialize;

use herald_core::types::{LiveSnapshot, Source};

use crate::{SourceError, StreamClient};

const CHANNELS_URL: &str = "https://kick.com/api/v2/channels";

pub struct KickClient {
    http: reqwest::Client,
}

impl KickClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    livestream: Option<Livestream>,
}

#[derive(Debug, Deserialize)]
struct Livestream {
    session_title: Option<String>,
    #[serde(default)]
    is_live: bool,
}

/// `livestream` is null while the channel is offline.
fn snapshot_from(response: ChannelResponse) -> LiveSnapshot {
    match response.livestream {
        Some(ls) if ls.is_live => LiveSnapshot {
            is_live: true,
            title: ls.session_title,
        },
        _ => LiveSnapshot::offline(),
    }
}

#[async_trait]
impl StreamClient for KickClient {
    async fn poll(&self, source: &Source) -> Result<LiveSnapshot, SourceError> {
        let url = format!("{CHANNELS_URL}/{}", source.handle);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(SourceError::InvalidResponse(format!(
                "channel not found: {}",
                source.handle
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
            });
        }

        let body: ChannelResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        Ok(snapshot_from(body))
    }
}
