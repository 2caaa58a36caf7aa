//! Configuration files on disk.

use wingman::WingmanConfig;
use wingman::config::ResponseMode;
use wingman::llm::Completion;
use wingman::router::TurnOutcome;

use crate::helpers::{harness_with, sample_config};

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    let config = sample_config();
    config.save_to_file(&path).expect("save");
    let loaded = WingmanConfig::from_file(&path).expect("load");

    assert_eq!(loaded.commands, config.commands);
    assert_eq!(loaded.avoid_commands, vec!["v_self_destruct"]);
    assert_eq!(loaded.player.name, "Mara");
    assert_eq!(
        loaded.keybindings.bindings.get("v_afterburner").map(|b| b.keys.as_str()),
        Some("lshift+lalt")
    );
    let afterburner = loaded.command("Afterburner").expect("afterburner");
    assert_eq!(afterburner.response_mode(), ResponseMode::Silent);
}

#[test]
fn invalid_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "commands = 3").expect("write");

    let err = WingmanConfig::from_file(&path).expect_err("invalid config");
    assert!(err.to_string().contains("config"), "unexpected error: {err}");
}

#[tokio::test]
async fn reloaded_config_drives_a_turn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    sample_config().save_to_file(&path).expect("save");
    let loaded = WingmanConfig::from_file(&path).expect("load");

    let mut h = harness_with(loaded, vec![Completion::text("unused")]);
    let outcome = h.orchestrator.handle_transcript("Go to Port Olisar").await;
    assert!(matches!(outcome, TurnOutcome::Instant { .. }));
    assert!(h.transport.requests().is_empty());
}
