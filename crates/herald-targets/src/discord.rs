//! Discord webhook client.
//!
//! Webhook executions cannot reply to earlier messages, so `reply_to`
//! is dropped with a debug log; the post goes out unthreaded rather
//! than failing the target.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use herald_core::types::PostId;

use crate::{SocialClient, TargetError};

pub struct DiscordClient {
    http: reqwest::Client,
    webhook_url: String,
}

impl DiscordClient {
    pub fn new(http: reqwest::Client, webhook_url: String) -> Self {
        Self { http, webhook_url }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[async_trait]
impl SocialClient for DiscordClient {
    async fn post(&self, message: &str, reply_to: Option<&PostId>) -> Result<PostId, TargetError> {
        if let Some(parent) = reply_to {
            tracing::debug!(%parent, "discord webhooks cannot reply; posting unthreaded");
        }

        // wait=true makes Discord return the created message (and its id).
        let response = self
            .http
            .post(&self.webhook_url)
            .query(&[("wait", "true")])
            .json(&json!({ "content": message }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 || status.as_u16() == 404 {
            // A deleted webhook arrives as 404, effectively revoked credentials.
            return Err(TargetError::Auth(format!("webhook returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TargetError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| TargetError::InvalidResponse(e.to_string()))?;
        Ok(PostId::new(body.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_parses() {
        let body: MessageResponse =
            serde_json::from_str(r#"{"id": "1190000000000000001", "channel_id": "99"}"#)
                .expect("parse");
        assert_eq!(body.id, "1190000000000000001");
    }
}
