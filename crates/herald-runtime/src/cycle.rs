//! Cycle aggregation: one polling pass across all configured sources.
//!
//! Polls run concurrently (bounded, individually timed out) but the
//! readings are fed to the tracker in source-config order, so the
//! transition lists, and therefore combined-message text, are
//! deterministic regardless of network timing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use herald_core::config::PollConfig;
use herald_core::tracker::SourceStateTracker;
use herald_core::types::{LiveSnapshot, Source, StreamPlatform, Transition, TransitionKind};
use herald_sources::{SourceError, StreamClient};

/// Result of one polling pass.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub went_live: Vec<Transition>,
    pub went_offline: Vec<Transition>,
    /// Sources that contributed no reading this cycle (error/timeout).
    pub failed_polls: usize,
}

impl CycleOutcome {
    pub fn is_quiet(&self) -> bool {
        self.went_live.is_empty() && self.went_offline.is_empty()
    }
}

/// Poll every registered source once and collect the cycle's committed
/// transitions. A failed or timed-out poll skips that source for this
/// cycle only; it never aborts the cycle.
pub async fn run_cycle(
    clients: &HashMap<StreamPlatform, Arc<dyn StreamClient>>,
    tracker: &mut SourceStateTracker,
    poll: &PollConfig,
) -> CycleOutcome {
    let sources: Vec<Source> = tracker.sources().cloned().collect();
    let semaphore = Arc::new(Semaphore::new(poll.max_in_flight.max(1)));
    let timeout = Duration::from_secs(poll.timeout_secs);

    type PollHandle = tokio::task::JoinHandle<Result<Result<LiveSnapshot, SourceError>, tokio::time::error::Elapsed>>;
    let mut handles: Vec<Option<PollHandle>> = Vec::with_capacity(sources.len());
    for source in &sources {
        let Some(client) = clients.get(&source.platform).map(Arc::clone) else {
            handles.push(None);
            continue;
        };
        let semaphore = Arc::clone(&semaphore);
        let source = source.clone();
        handles.push(Some(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("poll semaphore is never closed");
            tokio::time::timeout(timeout, client.poll(&source)).await
        })));
    }

    let mut outcome = CycleOutcome::default();
    for (source, handle) in sources.iter().zip(handles) {
        let snapshot = match handle {
            None => {
                tracing::warn!(%source, "no client for platform, skipping poll");
                outcome.failed_polls += 1;
                continue;
            }
            Some(handle) => match handle.await {
                Ok(Ok(Ok(snapshot))) => snapshot,
                Ok(Ok(Err(e))) => {
                    tracing::warn!(%source, "poll failed: {e}");
                    outcome.failed_polls += 1;
                    continue;
                }
                Ok(Err(_)) => {
                    tracing::warn!(%source, "poll timed out after {}s", poll.timeout_secs);
                    outcome.failed_polls += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%source, "poll task failed: {e}");
                    outcome.failed_polls += 1;
                    continue;
                }
            },
        };

        if let Some(transition) = tracker.observe(source, snapshot.is_live, snapshot.title) {
            tracing::info!(
                %source,
                kind = %transition.kind,
                title = transition.title.as_deref().unwrap_or(""),
                "transition committed"
            );
            match transition.kind {
                TransitionKind::WentLive => outcome.went_live.push(transition),
                TransitionKind::WentOffline => outcome.went_offline.push(transition),
            }
        }
    }

    outcome
}

// ─── Tests ───────────────────────────────────────────────────────
