//! Static template rendering.
//!
//! Deterministic and infallible: this is the fallback path behind the
//! LLM composer and the default composer on its own. Placeholders:
//!
//! - `{handle}`: account handle(s), comma-joined
//! - `{platform}`: platform display name(s), comma-joined, deduped
//! - `{platforms}`: alias of `{platform}` (reads better in combined templates)
//! - `{title}`: first non-empty stream title in the batch
//! - `{url}`: watch URL(s), space-joined

use herald_core::config::TemplateSet;
use herald_core::planner::AnnouncePhase;
use herald_core::types::Transition;

use crate::ComposeRequest;

pub struct TemplateComposer {
    templates: TemplateSet,
}

impl TemplateComposer {
    pub fn new(templates: TemplateSet) -> Self {
        Self { templates }
    }

    /// Render the template for this request and enforce the target's
    /// character limit.
    pub fn render(&self, req: &ComposeRequest) -> String {
        let combined = req.transitions.len() > 1;
        let template = match (req.phase, combined) {
            (AnnouncePhase::Live, false) => &self.templates.live,
            (AnnouncePhase::Live, true) => &self.templates.live_combined,
            (AnnouncePhase::End, false) => &self.templates.end,
            (AnnouncePhase::End, true) => &self.templates.end_combined,
            (AnnouncePhase::SessionEnd, _) => &self.templates.session_end,
        };
        let rendered = substitute(template, &req.transitions);
        truncate_chars(&rendered, req.target_kind.max_chars())
    }
}

fn substitute(template: &str, transitions: &[Transition]) -> String {
    let handles = join_unique(transitions.iter().map(|t| t.source.handle.clone()));
    let platforms = join_unique(
        transitions
            .iter()
            .map(|t| t.source.platform.display_name().to_owned()),
    );
    let title = transitions
        .iter()
        .find_map(|t| t.title.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or_default();
    let urls = transitions
        .iter()
        .map(|t| t.source.watch_url())
        .collect::<Vec<_>>()
        .join(" ");

    let rendered = template
        .replace("{handle}", &handles)
        .replace("{platforms}", &platforms)
        .replace("{platform}", &platforms)
        .replace("{title}", title)
        .replace("{url}", &urls);

    // An empty {title} or {url} leaves doubled spaces behind.
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_unique(values: impl Iterator<Item = String>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.join(", ")
}

/// Truncate to `max` characters on a char boundary, ending with an
/// ellipsis when anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ─── Tests ───────────────────────────────────────────────────────
