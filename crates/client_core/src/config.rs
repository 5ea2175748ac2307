use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::{EffectMode, UserId};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub content_base_url: String,
    pub user_id: UserId,
    pub effect_id: String,
    pub model: String,
    pub tool_type: String,
    pub mode: EffectMode,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub remove_watermark: bool,
    pub is_private: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.chromastudio.ai".into(),
            content_base_url: "https://contents.maxstudio.ai".into(),
            user_id: UserId::from("DObRu1vyStbUynoQmTcHBlhs55z2"),
            effect_id: "mugshot".into(),
            model: "image-effects".into(),
            tool_type: "image-effects".into(),
            mode: EffectMode::Image,
            poll_interval_ms: 2000,
            max_polls: 60,
            remove_watermark: true,
            is_private: true,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    content_base_url: Option<String>,
    user_id: Option<String>,
    effect_id: Option<String>,
    model: Option<String>,
    tool_type: Option<String>,
    mode: Option<String>,
    poll_interval_ms: Option<u64>,
    max_polls: Option<u32>,
    remove_watermark: Option<bool>,
    is_private: Option<bool>,
}

/// Defaults, then the TOML file at `path` if it exists, then environment overrides.
pub fn load_settings(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    let path = path.as_ref();
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    normalize(&mut settings);
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.content_base_url {
        settings.content_base_url = v;
    }
    if let Some(v) = file_cfg.user_id {
        settings.user_id = UserId(v);
    }
    if let Some(v) = file_cfg.effect_id {
        settings.effect_id = v;
    }
    if let Some(v) = file_cfg.model {
        settings.model = v;
    }
    if let Some(v) = file_cfg.tool_type {
        settings.tool_type = v;
    }
    if let Some(v) = file_cfg.mode {
        set_mode(settings, &v);
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.max_polls {
        settings.max_polls = v;
    }
    if let Some(v) = file_cfg.remove_watermark {
        settings.remove_watermark = v;
    }
    if let Some(v) = file_cfg.is_private {
        settings.is_private = v;
    }
    Ok(())
}

/// Each key is read as `STUDIO_<KEY>` and then `APP__<KEY>`; the latter wins.
pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| {
        lookup(&format!("APP__{key}")).or_else(|| lookup(&format!("STUDIO_{key}")))
    };

    if let Some(v) = var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("CONTENT_BASE_URL") {
        settings.content_base_url = v;
    }
    if let Some(v) = var("USER_ID") {
        settings.user_id = UserId(v);
    }
    if let Some(v) = var("EFFECT_ID") {
        settings.effect_id = v;
    }
    if let Some(v) = var("MODE") {
        set_mode(settings, &v);
    }
    if let Some(v) = var("POLL_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.poll_interval_ms = parsed;
        }
    }
    if let Some(v) = var("MAX_POLLS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.max_polls = parsed;
        }
    }
}

fn set_mode(settings: &mut Settings, raw: &str) {
    match EffectMode::parse(raw) {
        Some(mode) => settings.mode = mode,
        None => warn!(mode = raw, "config: ignoring unknown effect mode"),
    }
}

pub(crate) fn normalize(settings: &mut Settings) {
    settings.api_base_url = settings.api_base_url.trim().trim_end_matches('/').to_string();
    settings.content_base_url = settings
        .content_base_url
        .trim()
        .trim_end_matches('/')
        .to_string();
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
