//! Announcement orchestration for one cycle: plan → compose → dispatch
//! → write back.
//!
//! Thread-mode live units are dispatched strictly sequentially because
//! each unit's reply anchors are the previous unit's returned post ids.
//! Every other plan dispatches its units concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use herald_composer::{ComposeRequest, ComposerStack};
use herald_core::config::AnnounceConfig;
use herald_core::planner::{self, AnnouncementUnit, EndAnnounceMode};
use herald_core::session::PendingAllEndSet;
use herald_core::tracker::SourceStateTracker;
use herald_core::types::{PostId, TargetId, TargetKind};

use crate::cycle::CycleOutcome;
use crate::dispatch::{self, PreparedUnit, TargetDispatcher};

pub struct Announcer {
    dispatcher: Arc<TargetDispatcher>,
    composer: Arc<ComposerStack>,
    target_kinds: HashMap<TargetId, TargetKind>,
    announce: AnnounceConfig,
}

impl Announcer {
    pub fn new(
        dispatcher: Arc<TargetDispatcher>,
        composer: Arc<ComposerStack>,
        target_kinds: HashMap<TargetId, TargetKind>,
        announce: AnnounceConfig,
    ) -> Self {
        Self {
            dispatcher,
            composer,
            target_kinds,
            announce,
        }
    }

    /// Announce one cycle's transitions and write results back into the
    /// tracker.
    pub async fn announce_cycle(
        &self,
        outcome: &CycleOutcome,
        tracker: &mut SourceStateTracker,
        pending: &mut PendingAllEndSet,
    ) {
        if self.announce.end_mode == EndAnnounceMode::WaitForAllEnd {
            for transition in &outcome.went_live {
                pending.observe_live(&transition.source);
            }
        }

        // Live announcements first, so end replies within the same
        // cycle can anchor onto the fresh post ids.
        let live_units = planner::plan_live(&outcome.went_live, self.announce.live_mode);
        let chained = live_units.iter().any(|u| u.depends_on.is_some());
        let prepared = self.prepare(live_units).await;
        if chained {
            self.dispatch_chained(prepared, tracker).await;
        } else {
            self.dispatch_concurrent(prepared, tracker).await;
        }

        let end_plan = planner::plan_end(
            &outcome.went_offline,
            self.announce.end_mode,
            tracker,
            pending,
        );
        for (source, target) in &end_plan.unresolved_replies {
            tracing::warn!(
                %source,
                target_id = %target,
                "no live post recorded for thread reply, posting unthreaded"
            );
        }
        let prepared = self.prepare(end_plan.units).await;
        self.dispatch_concurrent(prepared, tracker).await;
    }

    /// Compose each unit's message once per routed target. Cached on
    /// the unit so dispatch retries never recompose.
    async fn prepare(&self, units: Vec<AnnouncementUnit>) -> Vec<PreparedUnit> {
        let mut prepared = Vec::with_capacity(units.len());
        for unit in units {
            let mut messages = HashMap::new();
            for target_id in unit.target_ids() {
                let Some(&kind) = self.target_kinds.get(&target_id) else {
                    tracing::warn!(target_id = %target_id, "routed target is not configured");
                    continue;
                };
                let request = ComposeRequest {
                    phase: unit.phase,
                    transitions: unit
                        .transitions_for(&target_id)
                        .into_iter()
                        .cloned()
                        .collect(),
                    target_kind: kind,
                };
                let message = self.composer.compose(&request).await;
                messages.insert(target_id, message);
            }
            prepared.push(PreparedUnit { unit, messages });
        }
        prepared
    }

    /// Sequential dispatch for reply-chained units: unit i+1 waits for
    /// unit i's post ids and anchors its replies onto them.
    async fn dispatch_chained(&self, prepared: Vec<PreparedUnit>, tracker: &mut SourceStateTracker) {
        let mut chain: HashMap<TargetId, PostId> = HashMap::new();
        for mut item in prepared {
            if item.unit.depends_on.is_some() {
                for (target, post_id) in &chain {
                    item.unit
                        .reply_to
                        .entry(target.clone())
                        .or_insert_with(|| post_id.clone());
                }
            }
            let results = self.dispatcher.dispatch_unit(&item).await;
            dispatch::record_outcomes(&item.unit, &results, tracker);
            // The next unit replies to *this* unit's posts only; a
            // target that failed here breaks its chain and continues
            // unthreaded.
            chain = results
                .iter()
                .filter_map(|(target, outcome)| {
                    outcome
                        .post_id()
                        .map(|id| (target.clone(), id.clone()))
                })
                .collect();
        }
    }

    async fn dispatch_concurrent(
        &self,
        prepared: Vec<PreparedUnit>,
        tracker: &mut SourceStateTracker,
    ) {
        if prepared.is_empty() {
            return;
        }
        let mut join = JoinSet::new();
        for item in prepared {
            let dispatcher = Arc::clone(&self.dispatcher);
            join.spawn(async move {
                let results = dispatcher.dispatch_unit(&item).await;
                (item, results)
            });
        }
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((item, results)) => dispatch::record_outcomes(&item.unit, &results, tracker),
                Err(e) => tracing::warn!("announcement task failed: {e}"),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
