//! Matrix room-message client (client-server API v3).
//!
//! Each send uses a fresh transaction id; Matrix deduplicates on it, so
//! a retry that reuses the id after a half-delivered send would be
//! idempotent, but retries here go through a new attempt counter and a
//! new txn id, matching the "retries may double-post" contract the
//! dispatcher assumes for every target.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use herald_core::types::PostId;

use crate::{SocialClient, TargetError};

pub struct MatrixClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    room_id: String,
    txn_counter: AtomicU64,
}

impl MatrixClient {
    pub fn new(http: reqwest::Client, base_url: String, token: String, room_id: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            room_id,
            txn_counter: AtomicU64::new(0),
        }
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("herald-{}-{n}", std::process::id())
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

fn build_content(message: &str, reply_to: Option<&PostId>) -> serde_json::Value {
    let mut content = json!({
        "msgtype": "m.text",
        "body": message,
    });
    if let Some(parent) = reply_to {
        content["m.relates_to"] = json!({
            "m.in_reply_to": { "event_id": parent.as_str() }
        });
    }
    content
}

#[async_trait]
impl SocialClient for MatrixClient {
    async fn post(&self, message: &str, reply_to: Option<&PostId>) -> Result<PostId, TargetError> {
        let url = format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.base_url,
            self.room_id,
            self.next_txn_id()
        );
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&build_content(message, reply_to))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TargetError::Auth(format!("send returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TargetError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| TargetError::InvalidResponse(e.to_string()))?;
        Ok(PostId::new(body.event_id))
    }
}
