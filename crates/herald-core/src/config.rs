//! Configuration surface, loaded once at process start.
//!
//! The types here are plain serde data; file reading and TOML parsing
//! happen in the runtime crate. `validate` catches the configuration
//! mistakes that would otherwise surface as permanent dispatch errors
//! at 3am: duplicate target ids, dangling route references, missing
//! per-kind credentials.

use serde::{Deserialize, Serialize};

use crate::planner::{EndAnnounceMode, LiveAnnounceMode};
use crate::retry::RetryPolicy;
use crate::types::{Source, StreamPlatform, TargetId, TargetKind};

// ─── Sections ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Tick interval while any tracked source is live (seconds).
    pub live_interval_secs: u64,
    /// Tick interval while every source is offline (seconds).
    pub offline_interval_secs: u64,
    /// Per-source poll timeout (seconds). Mandatory: one hung source
    /// must not stall the cycle.
    pub timeout_secs: u64,
    /// Maximum concurrent in-flight polls per cycle.
    pub max_in_flight: usize,
    /// Consecutive identical readings required to commit a state flip.
    pub debounce_threshold: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            live_interval_secs: 60,
            offline_interval_secs: 120,
            timeout_secs: 10,
            max_in_flight: 8,
            debounce_threshold: crate::debounce::DEFAULT_DEBOUNCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    pub live_mode: LiveAnnounceMode,
    pub end_mode: EndAnnounceMode,
}

/// Per-target outbound pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Concurrency slots for this target's post calls.
    pub max_concurrent: usize,
    /// Minimum spacing between consecutive post calls (milliseconds).
    pub min_spacing_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            min_spacing_ms: 1_000,
        }
    }
}

// ─── Sources & targets ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub platform: StreamPlatform,
    pub handle: String,
    /// Targets this source announces to. Empty means every configured
    /// target.
    #[serde(default)]
    pub targets: Vec<TargetId>,
}

impl SourceEntry {
    pub fn source(&self) -> Source {
        Source::new(self.platform, self.handle.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub id: TargetId,
    pub kind: TargetKind,
    /// Instance base URL (Mastodon, Matrix; Bluesky defaults to
    /// `https://bsky.social`).
    pub base_url: Option<String>,
    /// Access token (Mastodon, Matrix).
    pub token: Option<String>,
    /// Webhook URL (Discord).
    pub webhook_url: Option<String>,
    /// Account identifier (Bluesky handle or DID).
    pub identifier: Option<String>,
    /// App password (Bluesky).
    pub app_password: Option<String>,
    /// Room to post into (Matrix).
    pub room_id: Option<String>,
    #[serde(default)]
    pub pacing: PacingConfig,
}

// ─── Platform credentials ────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformAuthConfig {
    pub twitch: Option<TwitchAuth>,
    pub youtube: Option<YoutubeAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitchAuth {
    pub client_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeAuth {
    pub api_key: String,
}

// ─── Composer ────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposerKind {
    #[default]
    Template,
    Llm,
}

/// Announcement templates. Placeholders: `{handle}`, `{platform}`,
/// `{platforms}`, `{title}`, `{url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    pub live: String,
    pub live_combined: String,
    pub end: String,
    pub end_combined: String,
    pub session_end: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            live: "🔴 {handle} is live on {platform}: {title} {url}".to_owned(),
            live_combined: "🔴 {handle} now live on {platforms}: {title} {url}".to_owned(),
            end: "{handle} has finished streaming on {platform}.".to_owned(),
            end_combined: "The stream on {platforms} has ended.".to_owned(),
            session_end: "That's a wrap: the {platforms} streams have all ended. Thanks for watching!"
                .to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions base URL.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_max_tokens() -> u32 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub kind: ComposerKind,
    pub templates: TemplateSet,
    pub llm: Option<LlmConfig>,
    /// Process-wide cap on concurrent outbound composer calls.
    pub max_concurrent: usize,
    /// Minimum spacing between calls to the same provider (milliseconds).
    pub min_spacing_ms: u64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            kind: ComposerKind::Template,
            templates: TemplateSet::default(),
            llm: None,
            max_concurrent: 4,
            min_spacing_ms: 2_000,
        }
    }
}

// ─── Top level ───────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub poll: PollConfig,
    pub announce: AnnounceConfig,
    pub retry: RetryPolicy,
    pub composer: ComposerConfig,
    pub platforms: PlatformAuthConfig,
    pub sources: Vec<SourceEntry>,
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("no targets configured")]
    NoTargets,
    #[error("duplicate target id: {0}")]
    DuplicateTargetId(TargetId),
    #[error("duplicate source: {0}")]
    DuplicateSource(Source),
    #[error("source {src} routes to unknown target: {target}")]
    UnknownTargetRef { src: Source, target: TargetId },
    #[error("target {id} ({kind}) is missing required field `{field}`")]
    MissingTargetField {
        id: TargetId,
        kind: TargetKind,
        field: &'static str,
    },
    #[error("sources use {0} but [platforms.{0}] credentials are missing")]
    MissingPlatformAuth(StreamPlatform),
    #[error("composer kind is `llm` but [composer.llm] is missing")]
    MissingLlmConfig,
}

impl HeraldConfig {
    /// Validate cross-references and per-kind required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen_targets = Vec::new();
        for target in &self.targets {
            if seen_targets.contains(&&target.id) {
                return Err(ConfigError::DuplicateTargetId(target.id.clone()));
            }
            seen_targets.push(&target.id);
            validate_target_fields(target)?;
        }

        let mut seen_sources = Vec::new();
        for entry in &self.sources {
            let source = entry.source();
            if seen_sources.contains(&source) {
                return Err(ConfigError::DuplicateSource(source));
            }
            for target in &entry.targets {
                if !self.targets.iter().any(|t| &t.id == target) {
                    return Err(ConfigError::UnknownTargetRef {
                        src: source,
                        target: target.clone(),
                    });
                }
            }
            seen_sources.push(source);
        }

        for platform in [StreamPlatform::Twitch, StreamPlatform::Youtube] {
            let used = self.sources.iter().any(|s| s.platform == platform);
            let configured = match platform {
                StreamPlatform::Twitch => self.platforms.twitch.is_some(),
                StreamPlatform::Youtube => self.platforms.youtube.is_some(),
                StreamPlatform::Kick => true,
            };
            if used && !configured {
                return Err(ConfigError::MissingPlatformAuth(platform));
            }
        }

        if self.composer.kind == ComposerKind::Llm && self.composer.llm.is_none() {
            return Err(ConfigError::MissingLlmConfig);
        }

        Ok(())
    }

    /// Per-source target routing with the "empty means all" rule
    /// resolved, in source configuration order.
    pub fn source_routes(&self) -> Vec<(Source, Vec<TargetId>)> {
        let all: Vec<TargetId> = self.targets.iter().map(|t| t.id.clone()).collect();
        self.sources
            .iter()
            .map(|entry| {
                let route = if entry.targets.is_empty() {
                    all.clone()
                } else {
                    entry.targets.clone()
                };
                (entry.source(), route)
            })
            .collect()
    }
}

fn validate_target_fields(target: &TargetEntry) -> Result<(), ConfigError> {
    let missing = |field: &'static str| ConfigError::MissingTargetField {
        id: target.id.clone(),
        kind: target.kind,
        field,
    };
    match target.kind {
        TargetKind::Mastodon => {
            if target.base_url.is_none() {
                return Err(missing("base_url"));
            }
            if target.token.is_none() {
                return Err(missing("token"));
            }
        }
        TargetKind::Bluesky => {
            if target.identifier.is_none() {
                return Err(missing("identifier"));
            }
            if target.app_password.is_none() {
                return Err(missing("app_password"));
            }
        }
        TargetKind::Discord => {
            if target.webhook_url.is_none() {
                return Err(missing("webhook_url"));
            }
        }
        TargetKind::Matrix => {
            if target.base_url.is_none() {
                return Err(missing("base_url"));
            }
            if target.token.is_none() {
                return Err(missing("token"));
            }
            if target.room_id.is_none() {
                return Err(missing("room_id"));
            }
        }
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_EXAMPLE: &str = r#"
        [poll]
        live_interval_secs = 30
        offline_interval_secs = 90
        debounce_threshold = 3

        [announce]
        live_mode = "combined"
        end_mode = "wait_for_all_end"

        [retry]
        max_attempts = 5

        [composer]
        kind = "template"

        [composer.templates]
        live = "LIVE: {handle} {title}"

        [platforms.twitch]
        client_id = "cid"
        token = "tok"

        [[sources]]
        platform = "twitch"
        handle = "ada"
        targets = ["mastodon-main"]

        [[sources]]
        platform = "kick"
        handle = "grace"

        [[targets]]
        id = "mastodon-main"
        kind = "mastodon"
        base_url = "https://example.social"
        token = "secret"

        [[targets]]
        id = "discord-announce"
        kind = "discord"
        webhook_url = "https://discord.com/api/webhooks/1/x"
        pacing = { max_concurrent = 2, min_spacing_ms = 500 }
    "#;

    fn parsed() -> HeraldConfig {
        toml::from_str(FULL_EXAMPLE).expect("example config parses")
    }

    #[test]
    fn full_example_parses_and_validates() {
        let cfg = parsed();
        cfg.validate().expect("valid");
        assert_eq!(cfg.poll.live_interval_secs, 30);
        assert_eq!(cfg.poll.debounce_threshold, 3);
        assert_eq!(cfg.announce.live_mode, LiveAnnounceMode::Combined);
        assert_eq!(cfg.announce.end_mode, EndAnnounceMode::WaitForAllEnd);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.targets.len(), 2);
    }

    #[test]
    fn section_defaults_apply() {
        let cfg = parsed();
        assert_eq!(cfg.poll.timeout_secs, 10);
        assert_eq!(cfg.poll.max_in_flight, 8);
        assert_eq!(cfg.composer.max_concurrent, 4);
        assert_eq!(cfg.composer.min_spacing_ms, 2_000);
        // Overridden template keeps siblings at defaults.
        assert_eq!(cfg.composer.templates.live, "LIVE: {handle} {title}");
        assert!(cfg.composer.templates.end.contains("{handle}"));
    }

    #[test]
    fn target_pacing_inline_table() {
        let cfg = parsed();
        let discord = &cfg.targets[1];
        assert_eq!(discord.pacing.max_concurrent, 2);
        assert_eq!(discord.pacing.min_spacing_ms, 500);
        assert_eq!(cfg.targets[0].pacing, PacingConfig::default());
    }

    #[test]
    fn empty_source_targets_route_everywhere() {
        let cfg = parsed();
        let routes = cfg.source_routes();
        assert_eq!(routes[0].1, vec![TargetId::new("mastodon-main")]);
        assert_eq!(
            routes[1].1,
            vec![TargetId::new("mastodon-main"), TargetId::new("discord-announce")]
        );
    }

    #[test]
    fn rejects_empty_sources_and_targets() {
        let mut cfg = parsed();
        cfg.sources.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoSources));

        let mut cfg = parsed();
        cfg.targets.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoTargets));
    }

    #[test]
    fn rejects_duplicate_target_ids() {
        let mut cfg = parsed();
        let dup = cfg.targets[0].clone();
        cfg.targets.push(dup);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateTargetId(_))
        ));
    }

    #[test]
    fn rejects_duplicate_sources() {
        let mut cfg = parsed();
        let dup = cfg.sources[0].clone();
        cfg.sources.push(dup);
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateSource(_))));
    }

    #[test]
    fn rejects_unknown_target_reference() {
        let mut cfg = parsed();
        cfg.sources[0].targets = vec![TargetId::new("nope")];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnknownTargetRef { .. })
        ));
    }

    #[test]
    fn rejects_missing_twitch_credentials() {
        let mut cfg = parsed();
        cfg.platforms.twitch = None;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MissingPlatformAuth(StreamPlatform::Twitch))
        );
    }

    #[test]
    fn kick_needs_no_credentials() {
        let mut cfg = parsed();
        cfg.sources.retain(|s| s.platform == StreamPlatform::Kick);
        cfg.platforms.twitch = None;
        cfg.validate().expect("kick-only config is valid");
    }

    #[test]
    fn per_kind_required_fields() {
        let mut cfg = parsed();
        cfg.targets[0].token = None;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingTargetField { field: "token", .. })
        ));

        let mut cfg = parsed();
        cfg.targets[1].webhook_url = None;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingTargetField {
                field: "webhook_url",
                ..
            })
        ));
    }

    #[test]
    fn llm_kind_requires_llm_section() {
        let mut cfg = parsed();
        cfg.composer.kind = ComposerKind::Llm;
        assert_eq!(cfg.validate(), Err(ConfigError::MissingLlmConfig));

        cfg.composer.llm = Some(LlmConfig {
            base_url: "https://api.example.com/v1".to_owned(),
            api_key: Some("k".to_owned()),
            model: "small-1".to_owned(),
            max_tokens: 120,
        });
        cfg.validate().expect("valid with llm section");
    }
}
