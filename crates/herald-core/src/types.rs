use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Platform & Source ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum StreamPlatform {
    Twitch,
    Youtube,
    Kick,
}

impl StreamPlatform {
    pub const ALL: [Self; 3] = [Self::Twitch, Self::Youtube, Self::Kick];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Youtube => "youtube",
            Self::Kick => "kick",
        }
    }

    /// Human-facing platform name, used in composed announcement text.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Youtube => "YouTube",
            Self::Kick => "Kick",
        }
    }
}

impl fmt::Display for StreamPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamPlatform {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            "youtube" => Ok(Self::Youtube),
            "kick" => Ok(Self::Kick),
            _ => Err(HeraldError::UnknownPlatform(s.to_owned())),
        }
    }
}

/// One monitored streaming-platform account. Immutable once configured;
/// configuration order is significant (it drives deterministic batching).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub platform: StreamPlatform,
    pub handle: String,
}

impl Source {
    pub fn new(platform: StreamPlatform, handle: impl Into<String>) -> Self {
        Self {
            platform,
            handle: handle.into(),
        }
    }

    /// Public watch URL for this account, used in composed messages.
    pub fn watch_url(&self) -> String {
        match self.platform {
            StreamPlatform::Twitch => format!("https://twitch.tv/{}", self.handle),
            StreamPlatform::Youtube => format!("https://youtube.com/{}/live", self.handle),
            StreamPlatform::Kick => format!("https://kick.com/{}", self.handle),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.handle)
    }
}

// ─── Targets ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum TargetKind {
    Mastodon,
    Bluesky,
    Discord,
    Matrix,
}

impl TargetKind {
    pub const ALL: [Self; 4] = [Self::Mastodon, Self::Bluesky, Self::Discord, Self::Matrix];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mastodon => "mastodon",
            Self::Bluesky => "bluesky",
            Self::Discord => "discord",
            Self::Matrix => "matrix",
        }
    }

    /// Hard character limit enforced on composed messages for this kind.
    pub fn max_chars(self) -> usize {
        match self {
            Self::Mastodon => 500,
            Self::Bluesky => 300,
            Self::Discord => 2000,
            Self::Matrix => 4000,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Config-assigned identifier of one posting destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque identifier returned by a social target for a published post.
/// The core never inspects its contents; adapters may encode whatever
/// their reply mechanism needs (e.g. `uri|cid` pairs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Poll reading & transitions ───────────────────────────────────

/// One raw status reading from a stream platform client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub is_live: bool,
    pub title: Option<String>,
}

impl LiveSnapshot {
    pub fn live(title: impl Into<String>) -> Self {
        Self {
            is_live: true,
            title: Some(title.into()),
        }
    }

    pub fn offline() -> Self {
        Self {
            is_live: false,
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    WentLive,
    WentOffline,
}

impl TransitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WentLive => "went_live",
            Self::WentOffline => "went_offline",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed live/offline state change detected in one poll cycle.
/// Ephemeral: produced by the tracker, consumed by the planner within
/// the same cycle, never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub source: Source,
    pub kind: TransitionKind,
    pub title: Option<String>,
    /// Targets this source's announcements are routed to (config order).
    pub target_ids: Vec<TargetId>,
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeraldError {
    #[error("unknown stream platform: {0}")]
    UnknownPlatform(String),
    #[error("unknown target kind: {0}")]
    UnknownTargetKind(String),
    #[error("source not registered: {0}")]
    UnknownSource(String),
}

// ─── Tests ────────────────────────────────────────────────────────
