use super::*;

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_match_deployment_constants() {
    let settings = Settings::default();
    assert_eq!(settings.api_base_url, "https://api.chromastudio.ai");
    assert_eq!(settings.content_base_url, "https://contents.maxstudio.ai");
    assert_eq!(settings.mode, EffectMode::Image);
    assert_eq!(settings.poll_interval(), Duration::from_millis(2000));
    assert_eq!(settings.max_polls, 60);
    assert!(settings.remove_watermark && settings.is_private);
}

#[test]
fn file_values_override_defaults_and_unknown_keys_are_ignored() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
            api_base_url = "http://localhost:9000/"
            effect_id = "noir"
            mode = "video"
            max_polls = 5
            unrelated = "value"
        "#,
    )
    .expect("parse");
    normalize(&mut settings);

    assert_eq!(settings.api_base_url, "http://localhost:9000");
    assert_eq!(settings.effect_id, "noir");
    assert_eq!(settings.mode, EffectMode::Video);
    assert_eq!(settings.max_polls, 5);
    assert_eq!(settings.poll_interval_ms, 2000);
}

#[test]
fn malformed_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "max_polls = \"many\"").is_err());
}

#[test]
fn app_prefixed_env_wins_over_studio_prefix() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_of(&[
            ("STUDIO_USER_ID", "studio-user"),
            ("APP__USER_ID", "app-user"),
            ("STUDIO_POLL_INTERVAL_MS", "10"),
        ]),
    );
    assert_eq!(settings.user_id, UserId::from("app-user"));
    assert_eq!(settings.poll_interval_ms, 10);
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_of(&[("STUDIO_MAX_POLLS", "-3"), ("STUDIO_MODE", "hologram")]),
    );
    assert_eq!(settings.max_polls, 60);
    assert_eq!(settings.mode, EffectMode::Image);
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings(dir.path().join("absent.toml")).expect("load");
    assert_eq!(settings.effect_id, Settings::default().effect_id);
}

#[test]
fn config_file_on_disk_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("studio.toml");
    fs::write(&path, "content_base_url = \"https://cdn.example.test/\"\n").expect("write");

    let settings = load_settings(&path).expect("load");
    assert_eq!(settings.content_base_url, "https://cdn.example.test");
}
