//! Twitch Helix status client.

use async_trait::async_trait;
use serde::Deserialize;

use herald_core::config::TwitchAuth;
use herald_core::types::{LiveSnapshot, Source};

use crate::{SourceError, StreamClient};

const HELIX_STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";

pub struct TwitchClient {
    http: reqwest::Client,
    auth: TwitchAuth,
}

impl TwitchClient {
    pub fn new(http: reqwest::Client, auth: TwitchAuth) -> Self {
        Self { http, auth }
    }
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    data: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    title: String,
    #[serde(rename = "type")]
    stream_type: String,
}

/// `/helix/streams` returns an entry only while the channel is live;
/// an empty `data` array means offline.
fn snapshot_from(response: StreamsResponse) -> LiveSnapshot {
    match response.data.into_iter().next() {
        Some(entry) if entry.stream_type == "live" => LiveSnapshot {
            is_live: true,
            title: Some(entry.title),
        },
        _ => LiveSnapshot::offline(),
    }
}

#[async_trait]
impl StreamClient for TwitchClient {
    async fn poll(&self, source: &Source) -> Result<LiveSnapshot, SourceError> {
        let response = self
            .http
            .get(HELIX_STREAMS_URL)
            .query(&[("user_login", source.handle.as_str())])
            .header("Client-Id", &self.auth.client_id)
            .bearer_auth(&self.auth.token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SourceError::Auth(format!("helix returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
            });
        }

        let body: StreamsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        Ok(snapshot_from(body))
    }
}
