//! Config file loading and the `check` subcommand.

use std::path::Path;

use anyhow::Context;

use herald_composer::template::TemplateComposer;
use herald_composer::ComposeRequest;
use herald_core::config::HeraldConfig;
use herald_core::planner::AnnouncePhase;
use herald_core::types::{Transition, TransitionKind};

/// Load and validate the configuration file.
pub fn load(path: &Path) -> anyhow::Result<HeraldConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: HeraldConfig =
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Validate the config and print a template preview per target.
pub fn check(path: &Path) -> anyhow::Result<()> {
    let config = load(path)?;
    println!(
        "config ok: {} source(s), {} target(s)",
        config.sources.len(),
        config.targets.len()
    );

    let composer = TemplateComposer::new(config.composer.templates.clone());
    let routes = config.source_routes();
    for target in &config.targets {
        let transitions: Vec<Transition> = routes
            .iter()
            .filter(|(_, route)| route.contains(&target.id))
            .map(|(source, _)| Transition {
                source: source.clone(),
                kind: TransitionKind::WentLive,
                title: Some("Example stream title".to_owned()),
                target_ids: vec![target.id.clone()],
            })
            .collect();
        if transitions.is_empty() {
            println!("{} ({}): no sources routed", target.id, target.kind);
            continue;
        }
        let preview = composer.render(&ComposeRequest {
            phase: AnnouncePhase::Live,
            transitions,
            target_kind: target.kind,
        });
        println!("{} ({}): {}", target.id, target.kind, preview);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("herald-test-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp config");
        path
    }

    const MINIMAL: &str = r#"
        [[sources]]
        platform = "kick"
        handle = "ada"

        [[targets]]
        id = "discord-main"
        kind = "discord"
        webhook_url = "https://discord.example/webhook"
    "#;

    #[test]
    fn loads_minimal_config() {
        let path = write_temp("minimal.toml", MINIMAL);
        let config = load(&path).expect("loads");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.poll.debounce_threshold, 2, "defaults apply");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error_with_path_context() {
        let err = load(Path::new("/nonexistent/herald.toml")).expect_err("must fail");
        assert!(err.to_string().contains("/nonexistent/herald.toml"));
    }

    #[test]
    fn parse_error_mentions_file() {
        let path = write_temp("broken.toml", "not = [valid");
        let err = load(&path).expect_err("must fail");
        assert!(err.to_string().contains("failed to parse"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_config_fails_validation() {
        let path = write_temp("invalid.toml", "[poll]\nlive_interval_secs = 5\n");
        let err = load(&path).expect_err("must fail");
        assert!(err.to_string().contains("invalid configuration"));
        std::fs::remove_file(&path).ok();
    }
}
