//! Mastodon status client (`POST /api/v1/statuses`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use herald_core::types::PostId;

use crate::{SocialClient, TargetError};

pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MastodonClient {
    pub fn new(http: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct StatusRequest<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
}

fn build_request<'a>(message: &'a str, reply_to: Option<&'a PostId>) -> StatusRequest<'a> {
    StatusRequest {
        status: message,
        in_reply_to_id: reply_to.map(PostId::as_str),
    }
}

#[async_trait]
impl SocialClient for MastodonClient {
    async fn post(&self, message: &str, reply_to: Option<&PostId>) -> Result<PostId, TargetError> {
        let url = format!("{}/api/v1/statuses", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&build_request(message, reply_to))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TargetError::Auth(format!("statuses returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TargetError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        let body: StatusResponse = response
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
    fn reply_field_omitted_when_unthreaded() {
        let req = build_request("hello", None);
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["status"], "hello");
        assert!(json.get("in_reply_to_id").is_none());
    }

    #[test]
    fn reply_field_carries_post_id() {
        let parent = PostId::new("109501");
        let req = build_request("bye", Some(&parent));
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["in_reply_to_id"], "109501");
    }
}
