//! YouTube Data API live-status client.
//!
//! Uses the search endpoint filtered to live events for the configured
//! channel. One quota-heavy call per poll; the poll intervals in config
//! should account for the daily quota.

use async_trait::async_trait;
use serde::Deserialize;

use herald_core::config::YoutubeAuth;
use herald_core::types::{LiveSnapshot, Source};

use crate::{SourceError, StreamClient};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

pub struct YoutubeClient {
    http: reqwest::Client,
    auth: YoutubeAuth,
}

impl YoutubeClient {
    pub fn new(http: reqwest::Client, auth: YoutubeAuth) -> Self {
        Self { http, auth }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

fn snapshot_from(response: SearchResponse) -> LiveSnapshot {
    match response.items.into_iter().next() {
        Some(item) => LiveSnapshot {
            is_live: true,
            title: Some(item.snippet.title),
        },
        None => LiveSnapshot::offline(),
    }
}

#[async_trait]
impl StreamClient for YoutubeClient {
    async fn poll(&self, source: &Source) -> Result<LiveSnapshot, SourceError> {
        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("channelId", source.handle.as_str()),
                ("eventType", "live"),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.auth.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 403 {
            // Invalid or quota-exhausted API key both arrive as 400/403.
            return Err(SourceError::Auth(format!("data api returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        Ok(snapshot_from(body))
    }
}
