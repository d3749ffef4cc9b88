//! herald-composer: message composition for announcement units.
//!
//! A [`Composer`] turns (transition batch, target kind, phase) into the
//! text to post. The static [`template::TemplateComposer`] is always
//! available and deterministic; the optional [`llm::LlmComposer`] calls
//! an external generator and therefore runs behind the process-wide
//! [`gate::ComposerGate`]. [`ComposerStack`] wires the two together so
//! a generator failure always degrades to the template path.

pub mod gate;
pub mod llm;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use herald_core::config::TemplateSet;
use herald_core::planner::AnnouncePhase;
use herald_core::types::{TargetKind, Transition};

use gate::ComposerGate;
use template::TemplateComposer;

/// Everything a composer needs to produce one target's message.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub phase: AnnouncePhase,
    /// Transitions routed to this target, in source-config order.
    pub transitions: Vec<Transition>,
    pub target_kind: TargetKind,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("generator request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("generator returned status {status}")]
    Http { status: u16 },

    #[error("generator returned an empty message")]
    Empty,

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Capability interface for message generation. The returned string is
/// not yet length-enforced; the stack truncates to the target's limit.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, req: &ComposeRequest) -> Result<String, ComposeError>;
}

/// Primary-plus-fallback composition with rate limiting.
///
/// The primary (if any) runs behind the shared gate; any error or empty
/// result falls through to the deterministic template path, so
/// composition as a whole never fails.
pub struct ComposerStack {
    primary: Option<Arc<dyn Composer>>,
    fallback: TemplateComposer,
    gate: Arc<ComposerGate>,
}

impl ComposerStack {
    pub fn template_only(templates: TemplateSet) -> Self {
        Self {
            primary: None,
            fallback: TemplateComposer::new(templates),
            gate: Arc::new(ComposerGate::new(1, 0)),
        }
    }

    pub fn with_primary(
        primary: Arc<dyn Composer>,
        templates: TemplateSet,
        gate: Arc<ComposerGate>,
    ) -> Self {
        Self {
            primary: Some(primary),
            fallback: TemplateComposer::new(templates),
            gate,
        }
    }

    pub async fn compose(&self, req: &ComposeRequest) -> String {
        let limit = req.target_kind.max_chars();

        if let Some(primary) = &self.primary {
            let _slot = self.gate.acquire().await;
            match primary.compose(req).await {
                Ok(text) if !text.trim().is_empty() => {
                    return template::truncate_chars(text.trim(), limit);
                }
                Ok(_) => {
                    tracing::warn!(
                        target_kind = %req.target_kind,
                        "generator returned empty message, using template fallback"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target_kind = %req.target_kind,
                        "generator failed ({e}), using template fallback"
                    );
                }
            }
        }

        self.fallback.render(req)
    }
}

// ─── Tests ───────────────────────────────────────────────────────
