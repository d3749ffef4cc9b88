//! Target dispatch: deliver one announcement unit to every routed
//! target, with per-target pacing, retry with capped backoff, and
//! permanent-error disabling. Per-target failures are independent; the
//! unit's outcome is reported per target, never as a single pass/fail.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use herald_core::pacing::SpacingGate;
use herald_core::planner::{AnnouncePhase, AnnouncementUnit};
use herald_core::retry::RetryPolicy;
use herald_core::tracker::SourceStateTracker;
use herald_core::types::{PostId, TargetId};
use herald_targets::Target;

/// An announcement unit with its per-target composed messages. Messages
/// are cached once after planning so retries never recompose.
#[derive(Clone)]
pub struct PreparedUnit {
    pub unit: AnnouncementUnit,
    pub messages: HashMap<TargetId, String>,
}

/// Per-target outcome of dispatching one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Posted(PostId),
    /// Every attempt failed (or the single attempt hit a permanent error).
    Failed { attempts: u32, error: String },
    /// Target was disabled by an earlier permanent error; not attempted.
    TargetDisabled,
}

impl DispatchOutcome {
    pub fn post_id(&self) -> Option<&PostId> {
        match self {
            Self::Posted(id) => Some(id),
            _ => None,
        }
    }
}

struct TargetRuntime {
    target: Target,
    slots: Semaphore,
    spacing: Mutex<SpacingGate>,
    disabled: AtomicBool,
}

/// Dispatches prepared units to the configured targets.
pub struct TargetDispatcher {
    targets: HashMap<TargetId, Arc<TargetRuntime>>,
    retry: RetryPolicy,
    /// Epoch for the pacing gates' millisecond clock.
    started: Instant,
}

impl TargetDispatcher {
    pub fn new(targets: Vec<Target>, retry: RetryPolicy) -> Self {
        let targets = targets
            .into_iter()
            .map(|target| {
                let runtime = TargetRuntime {
                    slots: Semaphore::new(target.pacing.max_concurrent.max(1)),
                    spacing: Mutex::new(SpacingGate::new(target.pacing.min_spacing_ms)),
                    disabled: AtomicBool::new(false),
                    target,
                };
                (runtime.target.id.clone(), Arc::new(runtime))
            })
            .collect();
        Self {
            targets,
            retry,
            started: Instant::now(),
        }
    }

    /// Post one unit to every target it routes to, concurrently across
    /// targets.
    pub async fn dispatch_unit(&self, prepared: &PreparedUnit) -> HashMap<TargetId, DispatchOutcome> {
        let mut results = HashMap::new();
        let mut join = JoinSet::new();

        for target_id in prepared.unit.target_ids() {
            let Some(runtime) = self.targets.get(&target_id) else {
                tracing::warn!(target_id = %target_id, "routed target is not configured");
                continue;
            };
            if runtime.disabled.load(Ordering::Relaxed) {
                results.insert(target_id, DispatchOutcome::TargetDisabled);
                continue;
            }
            let Some(message) = prepared.messages.get(&target_id).cloned() else {
                tracing::warn!(target_id = %target_id, "no composed message for target, skipping");
                continue;
            };
            let reply_to = prepared.unit.reply_to.get(&target_id).cloned();
            let runtime = Arc::clone(runtime);
            let retry = self.retry;
            let epoch = self.started;
            join.spawn(async move {
                let outcome = post_with_retry(&runtime, &message, reply_to.as_ref(), retry, epoch).await;
                (runtime.target.id.clone(), outcome)
            });
        }

        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    results.insert(id, outcome);
                }
                Err(e) => tracing::warn!("dispatch task failed: {e}"),
            }
        }
        results
    }

    pub fn is_disabled(&self, target: &TargetId) -> bool {
        self.targets
            .get(target)
            .is_some_and(|rt| rt.disabled.load(Ordering::Relaxed))
    }
}

async fn post_with_retry(
    runtime: &TargetRuntime,
    message: &str,
    reply_to: Option<&PostId>,
    retry: RetryPolicy,
    epoch: Instant,
) -> DispatchOutcome {
    let _slot = runtime
        .slots
        .acquire()
        .await
        .expect("target semaphore is never closed");

    let mut attempts = 0u32;
    loop {
        let wait_ms = {
            let mut spacing = runtime.spacing.lock().await;
            spacing.reserve(epoch.elapsed().as_millis() as u64)
        };
        if wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        attempts += 1;
        match runtime.target.client.post(message, reply_to).await {
            Ok(post_id) => {
                tracing::info!(target_id = %runtime.target.id, %post_id, "posted");
                return DispatchOutcome::Posted(post_id);
            }
            Err(e) if e.is_permanent() => {
                // Logged once here; subsequent units see the disabled
                // flag and skip this target without re-logging.
                runtime.disabled.store(true, Ordering::Relaxed);
                tracing::error!(
                    target_id = %runtime.target.id,
                    "permanent error, disabling target until config is fixed: {e}"
                );
                return DispatchOutcome::Failed {
                    attempts,
                    error: e.to_string(),
                };
            }
            Err(e) if retry.allows_retry(attempts) => {
                let delay = jittered(retry.delay_for_retry(attempts - 1), retry.jitter_pct);
                tracing::warn!(
                    target_id = %runtime.target.id,
                    "transient error (attempt {attempts}), retrying in {delay}ms: {e}"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                tracing::warn!(
                    target_id = %runtime.target.id,
                    "giving up after {attempts} attempts: {e}"
                );
                return DispatchOutcome::Failed {
                    attempts,
                    error: e.to_string(),
                };
            }
        }
    }
}

/// Apply the policy's jitter fraction to a pre-jitter delay.
fn jittered(delay_ms: u64, jitter_pct: f64) -> u64 {
    if delay_ms == 0 || jitter_pct <= 0.0 {
        return delay_ms;
    }
    let factor = 1.0 + jitter_pct * rand::rng().random_range(-1.0..=1.0);
    (delay_ms as f64 * factor).max(0.0) as u64
}

/// Write dispatch results back into the tracker.
///
/// Live units record each involved source's post id per target (the
/// future "ended" reply anchors). Terminating units clear the sources'
/// live-post bookkeeping.
pub fn record_outcomes(
    unit: &AnnouncementUnit,
    results: &HashMap<TargetId, DispatchOutcome>,
    tracker: &mut SourceStateTracker,
) {
    match unit.phase {
        AnnouncePhase::Live => {
            for transition in &unit.transitions {
                for target in &transition.target_ids {
                    if let Some(DispatchOutcome::Posted(post_id)) = results.get(target) {
                        tracker.record_live_post(&transition.source, target, post_id.clone());
                    }
                }
            }
        }
        AnnouncePhase::End | AnnouncePhase::SessionEnd => {
            for transition in &unit.transitions {
                tracker.clear_live_posts(&transition.source);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
