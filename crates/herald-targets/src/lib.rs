//! herald-targets: social posting clients.
//!
//! One adapter per destination kind behind the [`SocialClient`]
//! capability trait. Adapters map the opaque `reply_to` post id onto
//! their platform's native reply/thread mechanism; a platform that has
//! none (Discord webhooks) degrades to an unthreaded post.
//!
//! Idempotency is NOT guaranteed: a retried post may double-post. The
//! dispatcher accepts that trade-off over dropping announcements.

pub mod bluesky;
pub mod discord;
pub mod error;
pub mod mastodon;
pub mod matrix;

use std::sync::Arc;

use async_trait::async_trait;

use herald_core::config::{PacingConfig, TargetEntry};
use herald_core::types::{PostId, TargetId, TargetKind};

pub use error::TargetError;

/// Capability interface for publishing one message to one destination.
#[async_trait]
pub trait SocialClient: Send + Sync {
    async fn post(&self, message: &str, reply_to: Option<&PostId>) -> Result<PostId, TargetError>;
}

/// A configured posting destination: identity, pacing limits, and the
/// kind-specific client.
#[derive(Clone)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
    pub pacing: PacingConfig,
    pub client: Arc<dyn SocialClient>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("pacing", &self.pacing)
            .field("client", &"<dyn SocialClient>")
            .finish()
    }
}

impl Target {
    pub fn new(
        id: TargetId,
        kind: TargetKind,
        pacing: PacingConfig,
        client: Arc<dyn SocialClient>,
    ) -> Self {
        Self {
            id,
            kind,
            pacing,
            client,
        }
    }
}

/// Build a [`Target`] from a validated config entry.
///
/// Missing per-kind fields are a config error; [`herald_core::config::HeraldConfig::validate`]
/// catches them before this point, so they map to [`TargetError::Config`].
pub fn build_target(entry: &TargetEntry, http: reqwest::Client) -> Result<Target, TargetError> {
    let missing =
        |field: &str| TargetError::Config(format!("target {}: missing {field}", entry.id));

    let client: Arc<dyn SocialClient> = match entry.kind {
        TargetKind::Mastodon => Arc::new(mastodon::MastodonClient::new(
            http,
            entry.base_url.clone().ok_or_else(|| missing("base_url"))?,
            entry.token.clone().ok_or_else(|| missing("token"))?,
        )),
        TargetKind::Bluesky => Arc::new(bluesky::BlueskyClient::new(
            http,
            entry
                .base_url
                .clone()
                .unwrap_or_else(|| bluesky::DEFAULT_PDS_URL.to_owned()),
            entry
                .identifier
                .clone()
                .ok_or_else(|| missing("identifier"))?,
            entry
                .app_password
                .clone()
                .ok_or_else(|| missing("app_password"))?,
        )),
        TargetKind::Discord => Arc::new(discord::DiscordClient::new(
            http,
            entry
                .webhook_url
                .clone()
                .ok_or_else(|| missing("webhook_url"))?,
        )),
        TargetKind::Matrix => Arc::new(matrix::MatrixClient::new(
            http,
            entry.base_url.clone().ok_or_else(|| missing("base_url"))?,
            entry.token.clone().ok_or_else(|| missing("token"))?,
            entry.room_id.clone().ok_or_else(|| missing("room_id"))?,
        )),
        // TargetKind is #[non_exhaustive]; any future variant has no client yet.
        _ => return Err(TargetError::Config(format!("target {}: unsupported kind", entry.id))),
    };

    Ok(Target::new(
        entry.id.clone(),
        entry.kind,
        entry.pacing,
        client,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: TargetKind) -> TargetEntry {
        TargetEntry {
            id: TargetId::new("t"),
            kind,
            base_url: Some("https://example.org".to_owned()),
            token: Some("tok".to_owned()),
            webhook_url: Some("https://discord.example/webhook".to_owned()),
            identifier: Some("user.example".to_owned()),
            app_password: Some("pass".to_owned()),
            room_id: Some("!room:example.org".to_owned()),
            pacing: PacingConfig::default(),
        }
    }

    #[test]
    fn builds_every_kind_from_full_entry() {
        let http = reqwest::Client::new();
        for kind in TargetKind::ALL {
            let target = build_target(&entry(kind), http.clone()).expect("builds");
            assert_eq!(target.kind, kind);
        }
    }

    #[test]
    fn missing_field_is_config_error() {
        let http = reqwest::Client::new();
        let mut e = entry(TargetKind::Discord);
        e.webhook_url = None;
        let err = build_target(&e, http).expect_err("must fail");
        assert!(matches!(err, TargetError::Config(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn bluesky_base_url_defaults_to_public_pds() {
        let http = reqwest::Client::new();
        let mut e = entry(TargetKind::Bluesky);
        e.base_url = None;
        build_target(&e, http).expect("default PDS applies");
    }
}
