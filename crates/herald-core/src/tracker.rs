//! Per-source state tracking: debounced live state, titles, and the
//! post-identifier bookkeeping needed to thread "ended" replies back to
//! the matching "went live" announcements.

use std::collections::HashMap;

use crate::debounce::{self, DebounceState};
use crate::types::{PostId, Source, TargetId, Transition, TransitionKind};

/// Mutable record for one configured source. Owned exclusively by the
/// [`SourceStateTracker`]; lives for the daemon lifetime.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub source: Source,
    /// Targets this source's announcements are routed to (config order).
    pub target_ids: Vec<TargetId>,
    /// Debounce state; `None` until the first successful poll.
    pub debounce: Option<DebounceState>,
    pub previous_is_live: bool,
    pub current_title: Option<String>,
    /// Post ids returned when this source's "went live" announcement was
    /// published, keyed by target. Consumed for threading the matching
    /// "ended" reply, then cleared by dispatch write-back.
    pub live_post_ids: HashMap<TargetId, PostId>,
}

impl SourceRecord {
    fn new(source: Source, target_ids: Vec<TargetId>) -> Self {
        Self {
            source,
            target_ids,
            debounce: None,
            previous_is_live: false,
            current_title: None,
            live_post_ids: HashMap::new(),
        }
    }

    /// Committed live state (`false` before the first poll).
    pub fn is_live(&self) -> bool {
        self.debounce.as_ref().is_some_and(|d| d.committed)
    }
}

/// Holds one [`SourceRecord`] per configured source, in configuration
/// order, plus a per-target index of the most recently published live
/// announcement (used by combined-mode end replies).
#[derive(Debug, Clone)]
pub struct SourceStateTracker {
    records: Vec<SourceRecord>,
    index: HashMap<Source, usize>,
    latest_live_posts: HashMap<TargetId, PostId>,
    debounce_threshold: u32,
}

impl SourceStateTracker {
    pub fn new(debounce_threshold: u32) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            latest_live_posts: HashMap::new(),
            debounce_threshold,
        }
    }

    /// Register a configured source. Registration order is preserved and
    /// drives deterministic transition ordering. Re-registering a source
    /// replaces its target routing but keeps its state.
    pub fn register(&mut self, source: Source, target_ids: Vec<TargetId>) {
        match self.index.get(&source) {
            Some(&i) => self.records[i].target_ids = target_ids,
            None => {
                self.index.insert(source.clone(), self.records.len());
                self.records.push(SourceRecord::new(source, target_ids));
            }
        }
    }

    /// Feed one raw poll reading for a source.
    ///
    /// Returns a [`Transition`] only when the debounced state commits a
    /// flip. The first reading of a source seeds its committed state and
    /// never produces a transition.
    pub fn observe(
        &mut self,
        source: &Source,
        is_live_now: bool,
        title: Option<String>,
    ) -> Option<Transition> {
        let i = *self.index.get(source)?;
        let record = &mut self.records[i];

        // Keep the title fresh on every live reading so an eventual
        // "ended" message reflects the last-known stream title.
        if is_live_now && title.is_some() {
            record.current_title = title.clone();
        }

        let Some(state) = record.debounce.as_ref() else {
            record.debounce = Some(DebounceState::seeded(is_live_now));
            return None;
        };

        let (next, out) = debounce::update(state, is_live_now, self.debounce_threshold);
        record.debounce = Some(next);

        if !out.changed {
            return None;
        }

        record.previous_is_live = !out.committed;
        let kind = if out.committed {
            TransitionKind::WentLive
        } else {
            TransitionKind::WentOffline
        };

        Some(Transition {
            source: record.source.clone(),
            kind,
            title: record.current_title.clone(),
            target_ids: record.target_ids.clone(),
        })
    }

    // ── Post-id bookkeeping ──────────────────────────────────────

    /// Record the post id returned for a source's live announcement on
    /// one target, and update the per-target latest-live index.
    pub fn record_live_post(&mut self, source: &Source, target: &TargetId, post_id: PostId) {
        if let Some(&i) = self.index.get(source) {
            self.records[i]
                .live_post_ids
                .insert(target.clone(), post_id.clone());
        }
        self.latest_live_posts.insert(target.clone(), post_id);
    }

    pub fn live_post(&self, source: &Source, target: &TargetId) -> Option<&PostId> {
        let &i = self.index.get(source)?;
        self.records[i].live_post_ids.get(target)
    }

    /// The most recently published live announcement on a target,
    /// across all sources.
    pub fn latest_live_post(&self, target: &TargetId) -> Option<&PostId> {
        self.latest_live_posts.get(target)
    }

    /// Clear a source's live-post bookkeeping once its terminating
    /// announcement has been dispatched.
    pub fn clear_live_posts(&mut self, source: &Source) {
        if let Some(&i) = self.index.get(source) {
            self.records[i].live_post_ids.clear();
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn any_live(&self) -> bool {
        self.records.iter().any(SourceRecord::is_live)
    }

    /// Registered sources in configuration order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.records.iter().map(|r| &r.source)
    }

    pub fn record(&self, source: &Source) -> Option<&SourceRecord> {
        self.index.get(source).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamPlatform;

    fn twitch(handle: &str) -> Source {
        Source::new(StreamPlatform::Twitch, handle)
    }

    fn tracker_with(sources: &[Source]) -> SourceStateTracker {
        let mut t = SourceStateTracker::new(2);
        for s in sources {
            t.register(s.clone(), vec![TargetId::new("main")]);
        }
        t
    }

    #[test]
    fn first_reading_seeds_without_transition() {
        let src = twitch("ada");
        let mut t = tracker_with(std::slice::from_ref(&src));
        assert!(t.observe(&src, true, Some("hello".into())).is_none());
        assert!(t.record(&src).expect("registered").is_live());
    }

    #[test]
    fn went_live_after_debounce() {
        let src = twitch("ada");
        let mut t = tracker_with(std::slice::from_ref(&src));
        assert!(t.observe(&src, false, None).is_none()); // seed offline
        assert!(t.observe(&src, true, Some("run 1".into())).is_none()); // 1 of 2
        let tr = t
            .observe(&src, true, Some("run 1".into()))
            .expect("should commit");
        assert_eq!(tr.kind, TransitionKind::WentLive);
        assert_eq!(tr.title.as_deref(), Some("run 1"));
        assert_eq!(tr.target_ids, vec![TargetId::new("main")]);
    }

    #[test]
    fn went_offline_keeps_last_title() {
        let src = twitch("ada");
        let mut t = tracker_with(std::slice::from_ref(&src));
        t.observe(&src, true, Some("finale".into())); // seed live
        t.observe(&src, false, None);
        let tr = t.observe(&src, false, None).expect("should commit");
        assert_eq!(tr.kind, TransitionKind::WentOffline);
        assert_eq!(tr.title.as_deref(), Some("finale"));
    }

    #[test]
    fn unregistered_source_is_ignored() {
        let mut t = tracker_with(&[]);
        assert!(t.observe(&twitch("ghost"), true, None).is_none());
    }

    #[test]
    fn title_refreshes_while_live() {
        let src = twitch("ada");
        let mut t = tracker_with(std::slice::from_ref(&src));
        t.observe(&src, true, Some("part 1".into()));
        t.observe(&src, true, Some("part 2".into()));
        assert_eq!(
            t.record(&src).expect("registered").current_title.as_deref(),
            Some("part 2")
        );
    }

    #[test]
    fn live_post_bookkeeping_roundtrip() {
        let src = twitch("ada");
        let target = TargetId::new("main");
        let mut t = tracker_with(std::slice::from_ref(&src));
        assert!(t.live_post(&src, &target).is_none());

        t.record_live_post(&src, &target, PostId::new("p-1"));
        assert_eq!(
            t.live_post(&src, &target).map(PostId::as_str),
            Some("p-1")
        );
        assert_eq!(
            t.latest_live_post(&target).map(PostId::as_str),
            Some("p-1")
        );

        t.clear_live_posts(&src);
        assert!(t.live_post(&src, &target).is_none());
        // Latest-live index survives clearing: it points at the most
        // recently *published* live post, not at a still-live source.
        assert!(t.latest_live_post(&target).is_some());
    }

    #[test]
    fn latest_live_post_tracks_most_recent_across_sources() {
        let a = twitch("ada");
        let b = twitch("grace");
        let target = TargetId::new("main");
        let mut t = tracker_with(&[a.clone(), b.clone()]);
        t.record_live_post(&a, &target, PostId::new("p-a"));
        t.record_live_post(&b, &target, PostId::new("p-b"));
        assert_eq!(
            t.latest_live_post(&target).map(PostId::as_str),
            Some("p-b")
        );
    }

    #[test]
    fn any_live_reflects_committed_state() {
        let a = twitch("ada");
        let b = twitch("grace");
        let mut t = tracker_with(&[a.clone(), b.clone()]);
        t.observe(&a, false, None);
        t.observe(&b, false, None);
        assert!(!t.any_live());

        t.observe(&a, true, None);
        assert!(!t.any_live(), "single live reading is not committed yet");
        t.observe(&a, true, None);
        assert!(t.any_live());
    }

    #[test]
    fn sources_iterate_in_config_order() {
        let a = twitch("ada");
        let b = twitch("grace");
        let c = twitch("joan");
        let t = tracker_with(&[b.clone(), a.clone(), c.clone()]);
        let order: Vec<&Source> = t.sources().collect();
        assert_eq!(order, vec![&b, &a, &c]);
    }

    #[test]
    fn reregister_updates_routing_keeps_state() {
        let src = twitch("ada");
        let mut t = tracker_with(std::slice::from_ref(&src));
        t.observe(&src, true, Some("x".into()));
        t.register(src.clone(), vec![TargetId::new("alt")]);
        assert_eq!(t.len(), 1);
        assert!(t.record(&src).expect("registered").is_live());
        assert_eq!(
            t.record(&src).expect("registered").target_ids,
            vec![TargetId::new("alt")]
        );
    }
}
