//! Announcement planning: turns one cycle's transitions into an ordered
//! list of announcement units under the configured threading strategy.
//!
//! Planning is pure collection logic with no IO and no clock. Dependencies
//! between units (thread-mode reply chains) are explicit: a unit that
//! must reply to the previous unit's post carries `depends_on`, and the
//! dispatcher enforces the ordering instead of relying on call order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::PendingAllEndSet;
use crate::tracker::SourceStateTracker;
use crate::types::{PostId, Source, TargetId, Transition, TransitionKind};

// ─── Modes ───────────────────────────────────────────────────────

/// Strategy for announcing sources that went live in the same cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveAnnounceMode {
    /// One standalone post per source.
    #[default]
    Separate,
    /// One post per source, each replying to the previous one.
    Thread,
    /// A single post bundling every source that went live this cycle.
    Combined,
}

/// Strategy for announcing sources that went offline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndAnnounceMode {
    /// No end announcements at all.
    #[default]
    Disabled,
    /// One standalone post per source.
    Separate,
    /// One post per source, each replying to that source's live post.
    Thread,
    /// A single post bundling every source that ended this cycle.
    Combined,
    /// Hold until every source that went live this session has ended,
    /// then post one summary.
    WaitForAllEnd,
}

/// Which planning rule produced a unit. Carried for logging and for the
/// dispatcher's write-back decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeUsed {
    Separate,
    Thread,
    Combined,
    WaitForAllEnd,
}

/// Announcement lifecycle phase of a unit, used by message composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncePhase {
    /// One or more sources went live.
    Live,
    /// One or more sources ended.
    End,
    /// Every source of the session has ended (wait-for-all summary).
    SessionEnd,
}

// ─── Announcement unit ───────────────────────────────────────────

/// One planned post, possibly bundling several transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementUnit {
    /// Transitions covered by this unit, in source-config order.
    pub transitions: Vec<Transition>,
    pub phase: AnnouncePhase,
    pub mode_used: ModeUsed,
    /// Index of the prior unit (within the same plan) whose dispatch
    /// results this unit's replies chain onto. Only thread-mode live
    /// units set this.
    pub depends_on: Option<usize>,
    /// Per-target reply anchor, pre-resolved where the planner can
    /// (end-thread and combined-end modes). Thread-mode live chains are
    /// filled in by the dispatcher from the prior unit's results.
    pub reply_to: HashMap<TargetId, PostId>,
}

impl AnnouncementUnit {
    fn new(phase: AnnouncePhase, mode_used: ModeUsed, transitions: Vec<Transition>) -> Self {
        Self {
            transitions,
            phase,
            mode_used,
            depends_on: None,
            reply_to: HashMap::new(),
        }
    }

    /// Union of the covered transitions' routed targets, first-seen order.
    pub fn target_ids(&self) -> Vec<TargetId> {
        let mut out: Vec<TargetId> = Vec::new();
        for t in &self.transitions {
            for id in &t.target_ids {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// Transitions routed to a given target (combined messages mention
    /// only the sources the target subscribed to).
    pub fn transitions_for(&self, target: &TargetId) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.target_ids.contains(target))
            .collect()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.transitions.iter().map(|t| &t.source)
    }
}

// ─── Planner context ─────────────────────────────────────────────

/// Read access the end planner needs into per-source state.
pub trait PlannerContext {
    /// Post id of `source`'s live announcement on `target`, if recorded.
    fn live_post(&self, source: &Source, target: &TargetId) -> Option<PostId>;
    /// Most recently published live announcement on `target`.
    fn latest_live_post(&self, target: &TargetId) -> Option<PostId>;
    /// Target routing for a source.
    fn route(&self, source: &Source) -> Vec<TargetId>;
    /// Last-known stream title for a source.
    fn title(&self, source: &Source) -> Option<String>;
}

impl PlannerContext for SourceStateTracker {
    fn live_post(&self, source: &Source, target: &TargetId) -> Option<PostId> {
        SourceStateTracker::live_post(self, source, target).cloned()
    }

    fn latest_live_post(&self, target: &TargetId) -> Option<PostId> {
        SourceStateTracker::latest_live_post(self, target).cloned()
    }

    fn route(&self, source: &Source) -> Vec<TargetId> {
        self.record(source)
            .map(|r| r.target_ids.clone())
            .unwrap_or_default()
    }

    fn title(&self, source: &Source) -> Option<String> {
        self.record(source).and_then(|r| r.current_title.clone())
    }
}

// ─── Live planning ───────────────────────────────────────────────

/// Plan announcement units for this cycle's went-live transitions.
pub fn plan_live(went_live: &[Transition], mode: LiveAnnounceMode) -> Vec<AnnouncementUnit> {
    if went_live.is_empty() {
        return Vec::new();
    }
    match mode {
        LiveAnnounceMode::Separate => went_live
            .iter()
            .map(|t| AnnouncementUnit::new(AnnouncePhase::Live, ModeUsed::Separate, vec![t.clone()]))
            .collect(),
        LiveAnnounceMode::Thread => went_live
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut unit =
                    AnnouncementUnit::new(AnnouncePhase::Live, ModeUsed::Thread, vec![t.clone()]);
                if i > 0 {
                    unit.depends_on = Some(i - 1);
                }
                unit
            })
            .collect(),
        LiveAnnounceMode::Combined => vec![AnnouncementUnit::new(
            AnnouncePhase::Live,
            ModeUsed::Combined,
            went_live.to_vec(),
        )],
    }
}

// ─── End planning ────────────────────────────────────────────────

/// Outcome of end planning: the units to dispatch plus the per-target
/// reply anchors the planner wanted but could not resolve (missing
/// live-post bookkeeping; announced unthreaded, logged by the caller).
#[derive(Debug, Clone, Default)]
pub struct EndPlan {
    pub units: Vec<AnnouncementUnit>,
    pub unresolved_replies: Vec<(Source, TargetId)>,
}

/// Plan announcement units for this cycle's went-offline transitions.
///
/// Under [`EndAnnounceMode::WaitForAllEnd`] this also advances the
/// pending session window; the summary unit is emitted exactly when the
/// window drains, covering every participant (not just this cycle's
/// transitions).
pub fn plan_end(
    went_offline: &[Transition],
    mode: EndAnnounceMode,
    ctx: &dyn PlannerContext,
    pending: &mut PendingAllEndSet,
) -> EndPlan {
    let mut plan = EndPlan::default();

    match mode {
        EndAnnounceMode::Disabled => {}
        EndAnnounceMode::Separate => {
            for t in went_offline {
                plan.units.push(AnnouncementUnit::new(
                    AnnouncePhase::End,
                    ModeUsed::Separate,
                    vec![t.clone()],
                ));
            }
        }
        EndAnnounceMode::Thread => {
            for t in went_offline {
                let mut unit =
                    AnnouncementUnit::new(AnnouncePhase::End, ModeUsed::Thread, vec![t.clone()]);
                for target in &t.target_ids {
                    match ctx.live_post(&t.source, target) {
                        Some(post_id) => {
                            unit.reply_to.insert(target.clone(), post_id);
                        }
                        None => {
                            plan.unresolved_replies
                                .push((t.source.clone(), target.clone()));
                        }
                    }
                }
                plan.units.push(unit);
            }
        }
        EndAnnounceMode::Combined => {
            if !went_offline.is_empty() {
                let mut unit = AnnouncementUnit::new(
                    AnnouncePhase::End,
                    ModeUsed::Combined,
                    went_offline.to_vec(),
                );
                for target in unit.target_ids() {
                    if let Some(post_id) = ctx.latest_live_post(&target) {
                        unit.reply_to.insert(target, post_id);
                    }
                }
                plan.units.push(unit);
            }
        }
        EndAnnounceMode::WaitForAllEnd => {
            let mut drained = false;
            for t in went_offline {
                if pending.observe_offline(&t.source) {
                    drained = true;
                }
            }
            if drained {
                let participants = pending.drain();
                let transitions: Vec<Transition> = participants
                    .iter()
                    .map(|source| Transition {
                        source: source.clone(),
                        kind: TransitionKind::WentOffline,
                        title: ctx.title(source),
                        target_ids: ctx.route(source),
                    })
                    .collect();
                let mut unit = AnnouncementUnit::new(
                    AnnouncePhase::SessionEnd,
                    ModeUsed::WaitForAllEnd,
                    transitions,
                );
                for target in unit.target_ids() {
                    if let Some(post_id) = ctx.latest_live_post(&target) {
                        unit.reply_to.insert(target, post_id);
                    }
                }
                plan.units.push(unit);
            }
        }
    }

    plan
}

// ─── Tests ───────────────────────────────────────────────────────
