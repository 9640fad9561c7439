use std::{collections::HashMap, fs, path::PathBuf};

use client_core::DEFAULT_DRAG_THRESHOLD;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "scene_cli.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub username: String,
    pub drag_threshold: f32,
    pub default_project_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".into(),
            username: "anonymous".into(),
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            default_project_dir: PathBuf::from("./projects"),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Overlays keys from a `scene_cli.toml` body. Unknown keys are ignored.
pub fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(%err, "config: ignoring unreadable {SETTINGS_FILE}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("username").and_then(toml::Value::as_str) {
        settings.username = v.to_string();
    }
    match file_cfg.get("drag_threshold") {
        Some(toml::Value::Float(v)) => settings.drag_threshold = *v as f32,
        Some(toml::Value::Integer(v)) => settings.drag_threshold = *v as f32,
        _ => {}
    }
    if let Some(v) = file_cfg
        .get("default_project_dir")
        .and_then(toml::Value::as_str)
    {
        settings.default_project_dir = PathBuf::from(v);
    }
}

/// Environment overrides. `APP__*` names win over the short forms.
pub fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SCENE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("SCENE_USERNAME") {
        settings.username = v;
    }
    if let Some(v) = var("APP__USERNAME") {
        settings.username = v;
    }

    if let Some(v) = var("APP__DRAG_THRESHOLD") {
        match v.parse::<f32>() {
            Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => {
                settings.drag_threshold = parsed;
            }
            _ => warn!(value = %v, "config: ignoring invalid APP__DRAG_THRESHOLD"),
        }
    }

    if let Some(v) = var("APP__DEFAULT_PROJECT_DIR") {
        settings.default_project_dir = PathBuf::from(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
