//! Driver loop: wires sources → tracker → planner → composer → targets.
//! Runs as a single periodic task; the tick interval tightens while any
//! source is live and relaxes while everything is offline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use herald_composer::gate::ComposerGate;
use herald_composer::llm::LlmComposer;
use herald_composer::ComposerStack;
use herald_core::config::{ComposerKind, HeraldConfig};
use herald_core::session::PendingAllEndSet;
use herald_core::tracker::SourceStateTracker;
use herald_core::types::{StreamPlatform, TargetKind};
use herald_sources::StreamClient;
use herald_targets::build_target;

use crate::announcer::Announcer;
use crate::cycle;
use crate::dispatch::TargetDispatcher;

/// Run the daemon until shutdown (or for a single cycle with `once`).
///
/// Graceful shutdown: ctrl-c/SIGTERM is only observed between cycles,
/// so in-flight dispatches always finish; their post ids matter for
/// future threading.
pub async fn run_daemon(config: HeraldConfig, once: bool) -> anyhow::Result<()> {
    config.validate()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    // One stream client per platform in use.
    let mut clients: HashMap<StreamPlatform, Arc<dyn StreamClient>> = HashMap::new();
    for entry in &config.sources {
        if clients.contains_key(&entry.platform) {
            continue;
        }
        match herald_sources::client_for(entry.platform, http.clone(), &config.platforms) {
            Some(client) => {
                clients.insert(entry.platform, client);
            }
            None => anyhow::bail!("missing credentials for platform {}", entry.platform),
        }
    }

    // Posting targets and their dispatcher.
    let mut targets = Vec::with_capacity(config.targets.len());
    let mut target_kinds: HashMap<_, TargetKind> = HashMap::new();
    for entry in &config.targets {
        let target = build_target(entry, http.clone())
            .map_err(|e| anyhow::anyhow!("target {}: {e}", entry.id))?;
        target_kinds.insert(target.id.clone(), target.kind);
        targets.push(target);
    }
    let dispatcher = Arc::new(TargetDispatcher::new(targets, config.retry));

    let composer = match config.composer.kind {
        ComposerKind::Template => {
            ComposerStack::template_only(config.composer.templates.clone())
        }
        ComposerKind::Llm => {
            let llm_config = config
                .composer
                .llm
                .clone()
                .ok_or_else(|| anyhow::anyhow!("composer kind is llm but [composer.llm] is missing"))?;
            let gate = Arc::new(ComposerGate::new(
                config.composer.max_concurrent,
                config.composer.min_spacing_ms,
            ));
            ComposerStack::with_primary(
                Arc::new(LlmComposer::new(http.clone(), llm_config)),
                config.composer.templates.clone(),
                gate,
            )
        }
    };

    let announcer = Announcer::new(
        dispatcher,
        Arc::new(composer),
        target_kinds,
        config.announce,
    );

    let mut tracker = SourceStateTracker::new(config.poll.debounce_threshold);
    for (source, route) in config.source_routes() {
        tracker.register(source, route);
    }
    let mut pending = PendingAllEndSet::new();

    tracing::info!(
        sources = tracker.len(),
        targets = config.targets.len(),
        live_mode = ?config.announce.live_mode,
        end_mode = ?config.announce.end_mode,
        "daemon started"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let outcome = cycle::run_cycle(&clients, &mut tracker, &config.poll).await;
        if !outcome.is_quiet() {
            tracing::info!(
                went_live = outcome.went_live.len(),
                went_offline = outcome.went_offline.len(),
                "announcing transitions"
            );
        }
        announcer
            .announce_cycle(&outcome, &mut tracker, &mut pending)
            .await;

        if once {
            break;
        }

        let interval = if tracker.any_live() {
            Duration::from_secs(config.poll.live_interval_secs)
        } else {
            Duration::from_secs(config.poll.offline_interval_secs)
        };
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = &mut shutdown => {
                tracing::info!("shutdown requested, exiting after current cycle");
                break;
            }
        }
    }

    tracing::info!("daemon stopped");
    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c");
    }
}
