use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use gesture_core::{GestureTable, TablePreset};
use serde::Deserialize;
use shared::protocol::SpaceOpenOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedOpenResult {
    #[default]
    Opened,
    Cancelled,
    Error,
}

impl SimulatedOpenResult {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim() {
            "opened" => Ok(Self::Opened),
            "cancelled" => Ok(Self::Cancelled),
            "error" => Ok(Self::Error),
            other => bail!("unknown space open result '{other}' (expected opened, cancelled or error)"),
        }
    }

    pub fn outcome(&self) -> SpaceOpenOutcome {
        match self {
            Self::Opened => SpaceOpenOutcome::Opened,
            Self::Cancelled => SpaceOpenOutcome::UserCancelled,
            Self::Error => SpaceOpenOutcome::Error("simulated scene failure".into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub log_filter: String,
    pub table_preset: TablePreset,
    pub table_path: Option<PathBuf>,
    pub target_identity: Option<String>,
    pub artist: String,
    pub space_open_delay: Duration,
    pub space_open_result: SimulatedOpenResult,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            table_preset: TablePreset::Amuse,
            table_path: None,
            target_identity: None,
            artist: "Dua Lipa".into(),
            space_open_delay: Duration::from_millis(250),
            space_open_result: SimulatedOpenResult::Opened,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    log_filter: Option<String>,
    table_preset: Option<String>,
    table_path: Option<PathBuf>,
    target_identity: Option<String>,
    artist: Option<String>,
    space_open_delay_ms: Option<u64>,
    space_open_result: Option<String>,
}

/// Defaults, then `path` if it exists, then `APP__*` environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: SettingsFile = toml::from_str(raw)?;

    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file.table_preset {
        settings.table_preset = v.parse()?;
    }
    if let Some(v) = file.table_path {
        settings.table_path = Some(v);
    }
    if let Some(v) = file.target_identity {
        settings.target_identity = non_empty(v);
    }
    if let Some(v) = file.artist {
        settings.artist = v;
    }
    if let Some(v) = file.space_open_delay_ms {
        settings.space_open_delay = Duration::from_millis(v);
    }
    if let Some(v) = file.space_open_result {
        settings.space_open_result = SimulatedOpenResult::parse(&v)?;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__TABLE_PRESET") {
        settings.table_preset = v.parse()?;
    }
    if let Some(v) = lookup("APP__TABLE_PATH") {
        settings.table_path = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("APP__TARGET_IDENTITY") {
        settings.target_identity = non_empty(v);
    }
    if let Some(v) = lookup("APP__ARTIST") {
        settings.artist = v;
    }
    if let Some(v) = lookup("APP__SPACE_OPEN_DELAY_MS") {
        let ms = v
            .parse::<u64>()
            .with_context(|| format!("APP__SPACE_OPEN_DELAY_MS must be an integer, got '{v}'"))?;
        settings.space_open_delay = Duration::from_millis(ms);
    }
    if let Some(v) = lookup("APP__SPACE_OPEN_RESULT") {
        settings.space_open_result = SimulatedOpenResult::parse(&v)?;
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn load_gesture_table(settings: &Settings) -> anyhow::Result<GestureTable> {
    let Some(path) = &settings.table_path else {
        return Ok(GestureTable::preset(settings.table_preset));
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read gesture table '{}'", path.display()))?;
    GestureTable::from_toml_str(&raw)
        .with_context(|| format!("invalid gesture table '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
