//! Bluesky (AT Protocol) posting client.
//!
//! Replies need both the parent record's `uri` and `cid`, so this
//! adapter encodes the pair into the opaque post id as `uri|cid`. The
//! chain anchors replies with `root = parent`, which threads correctly
//! for the two-deep chains the announcer produces.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use herald_core::types::PostId;

use crate::{SocialClient, TargetError};

pub const DEFAULT_PDS_URL: &str = "https://bsky.social";

pub struct BlueskyClient {
    http: reqwest::Client,
    base_url: String,
    identifier: String,
    app_password: String,
    session: Mutex<Option<Session>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
    cid: String,
}

/// Split an encoded `uri|cid` post id back into its reply components.
fn decode_post_id(id: &PostId) -> Option<(&str, &str)> {
    id.as_str().split_once('|')
}

fn encode_post_id(uri: &str, cid: &str) -> PostId {
    PostId::new(format!("{uri}|{cid}"))
}

impl BlueskyClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        identifier: String,
        app_password: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            identifier,
            app_password,
            session: Mutex::new(None),
        }
    }

    async fn login(&self) -> Result<Session, TargetError> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "identifier": self.identifier,
                "password": self.app_password,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(TargetError::Auth("createSession rejected".to_owned()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TargetError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TargetError::InvalidResponse(e.to_string()))
    }

    async fn current_session(&self) -> Result<Session, TargetError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.login().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }
}

fn build_record(did: &str, message: &str, reply_to: Option<&PostId>, created_at: String) -> serde_json::Value {
    let mut record = json!({
        "$type": "app.bsky.feed.post",
        "text": message,
        "createdAt": created_at,
    });
    if let Some((uri, cid)) = reply_to.and_then(decode_post_id) {
        let anchor = json!({ "uri": uri, "cid": cid });
        record["reply"] = json!({ "root": anchor, "parent": anchor });
    }
    json!({
        "repo": did,
        "collection": "app.bsky.feed.post",
        "record": record,
    })
}

#[async_trait]
impl SocialClient for BlueskyClient {
    async fn post(&self, message: &str, reply_to: Option<&PostId>) -> Result<PostId, TargetError> {
        let session = self.current_session().await?;
        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.base_url);
        let created_at = chrono::Utc::now().to_rfc3339();
        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_jwt)
            .json(&build_record(&session.did, message, reply_to, created_at))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            // Access token expired; drop the cached session so the next
            // retry re-authenticates.
            self.invalidate_session().await;
            return Err(TargetError::Network("session expired".to_owned()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TargetError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        let body: CreateRecordResponse = response
            .json()
            .await
            .map_err(|e| TargetError::InvalidResponse(e.to_string()))?;
        Ok(encode_post_id(&body.uri, &body.cid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_roundtrips_uri_and_cid() {
        let id = encode_post_id("at://did:plc:x/app.bsky.feed.post/3k", "bafyabc");
        assert_eq!(
            decode_post_id(&id),
            Some(("at://did:plc:x/app.bsky.feed.post/3k", "bafyabc"))
        );
    }

    #[test]
    fn foreign_post_id_decodes_to_none() {
        assert!(decode_post_id(&PostId::new("109501")).is_none());
    }

    #[test]
    fn record_without_reply_has_no_reply_field() {
        let body = build_record("did:plc:me", "hi", None, "2026-01-01T00:00:00+00:00".into());
        assert!(body["record"].get("reply").is_none());
        assert_eq!(body["record"]["text"], "hi");
        assert_eq!(body["repo"], "did:plc:me");
    }

    #[test]
    fn record_with_reply_anchors_root_and_parent() {
        let parent = encode_post_id("at://x/3k", "bafy1");
        let body = build_record(
            "did:plc:me",
            "bye",
            Some(&parent),
            "2026-01-01T00:00:00+00:00".into(),
        );
        assert_eq!(body["record"]["reply"]["parent"]["uri"], "at://x/3k");
        assert_eq!(body["record"]["reply"]["parent"]["cid"], "bafy1");
        assert_eq!(body["record"]["reply"]["root"]["cid"], "bafy1");
    }
}
