//! Integration tests for parts_runtime: full sandbox runs from config

use approx::assert_abs_diff_eq;
use parts_gamestate::{Prefs, PrefsFormat, HIGH_SCORE_KEY};
use parts_runtime::*;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("parts_runtime_{}_{}", std::process::id(), name))
}

fn short_config(seed: u64) -> SandboxConfig {
    SandboxConfig::from_toml(&format!(
        r#"
        [sandbox]
        duration = 15.0
        seed = {}
        "#,
        seed
    ))
    .unwrap()
}

#[test]
fn test_seeded_run() {
    let mut sandbox = Sandbox::new(short_config(11)).unwrap();
    let summary = sandbox.run();

    assert_abs_diff_eq!(summary.elapsed, 15.0, epsilon = 0.05);
    assert!(summary.scene.is_some());
    assert!(summary.shots > 0);
    assert!(summary.kills > 0);
    // Every kill is worth at least ten points
    assert!(summary.score >= 10 * summary.kills as i32);
    assert!(summary.high_score >= summary.score);
}

#[test]
fn test_same_seed_same_run() {
    let a = Sandbox::new(short_config(5)).unwrap().run();
    let b = Sandbox::new(short_config(5)).unwrap().run();
    assert_eq!(a, b);
}

#[test]
fn test_config_file() {
    let path = temp_path("sandbox.toml");
    std::fs::write(
        &path,
        r#"
        [sandbox]
        duration = 2.0
        levels = ["Yard"]

        [player]
        max_health = 40.0
        "#,
    )
    .unwrap();

    let config = SandboxConfig::load_from_file(&path).unwrap();
    assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(config.sandbox.levels, vec!["Yard".to_string()]);

    let summary = Sandbox::new(config).unwrap().run();
    assert_eq!(summary.scene.as_deref(), Some("Yard"));
    assert!(summary.player_health <= 40.0);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_high_score_persists() {
    let prefs = temp_path("prefs.json");
    std::fs::remove_file(&prefs).ok();

    let mut config = short_config(3);
    config.sandbox.prefs_path = Some(prefs.clone());
    config.sandbox.prefs_format = PrefsFormat::Json;
    let summary = Sandbox::new(config).unwrap().run();
    assert!(summary.high_score > 0);

    let saved = Prefs::open(&prefs, PrefsFormat::Json).unwrap();
    assert_eq!(saved.get_int(HIGH_SCORE_KEY, 0), summary.high_score);
    // The mixer wrote its levels on the way out
    assert_eq!(saved.get_float("MasterVolume", 0.0), 1.0);

    std::fs::remove_file(&prefs).ok();
}
