//! Identity-string to command bindings.
//!
//! Keys are the exact strings gesture packages report in their metadata.
//! Lookups never normalise case or whitespace.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use shared::{error::GestureTableError, protocol::CommandKind};

pub const OPEN_DASHBOARD: &str = "Opening the dashboard";
pub const LEFT_MIDDLE_CLICK: &str = "Use your left thumb tip to click your left middle finger tip";
/// Same description as reported by some package builds, with a trailing U+FFFC.
pub const LEFT_MIDDLE_CLICK_WITH_OBJECT_MARKER: &str =
    "Use your left thumb tip to click your left middle finger tip\u{FFFC}";
pub const RING_THUMB_TIP_TOUCH: &str = "Ring thumb tip touch";
pub const PEACE_SIGN: &str = "Peace Sign";
pub const SPIDER_MAN: &str = "Spider-Man";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePreset {
    /// Play/pause bound to "Peace Sign".
    #[default]
    Amuse,
    /// Play/pause bound to "Spider-Man".
    MusicKit,
}

impl FromStr for TablePreset {
    type Err = GestureTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amuse" => Ok(Self::Amuse),
            "music_kit" | "music-kit" => Ok(Self::MusicKit),
            other => Err(GestureTableError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for TablePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Amuse => "amuse",
            Self::MusicKit => "music_kit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureTable {
    entries: HashMap<String, CommandKind>,
}

#[derive(Debug, Deserialize)]
struct GestureTableFile {
    gestures: BTreeMap<String, String>,
}

impl GestureTable {
    pub fn preset(preset: TablePreset) -> Self {
        let play_pause = match preset {
            TablePreset::Amuse => PEACE_SIGN,
            TablePreset::MusicKit => SPIDER_MAN,
        };
        let entries = [
            (OPEN_DASHBOARD, CommandKind::ToggleImmersiveSpace),
            (LEFT_MIDDLE_CLICK, CommandKind::SkipPrevious),
            (LEFT_MIDDLE_CLICK_WITH_OBJECT_MARKER, CommandKind::SkipPrevious),
            (play_pause, CommandKind::TogglePlayPause),
            (RING_THUMB_TIP_TOUCH, CommandKind::SkipNext),
        ]
        .into_iter()
        .map(|(identity, command)| (identity.to_string(), command))
        .collect();
        Self { entries }
    }

    pub fn from_entries<I, K>(entries: I) -> Result<Self, GestureTableError>
    where
        I: IntoIterator<Item = (K, CommandKind)>,
        K: Into<String>,
    {
        let mut table = HashMap::new();
        for (identity, command) in entries {
            let identity = identity.into();
            if identity.is_empty() {
                return Err(GestureTableError::EmptyIdentity);
            }
            table.insert(identity, command);
        }
        if table.is_empty() {
            return Err(GestureTableError::Empty);
        }
        Ok(Self { entries: table })
    }

    /// Parses a `[gestures]` TOML table of `"identity" = "command"` pairs.
    pub fn from_toml_str(raw: &str) -> Result<Self, GestureTableError> {
        let file: GestureTableFile =
            toml::from_str(raw).map_err(|err| GestureTableError::Parse(err.to_string()))?;

        let mut entries = Vec::with_capacity(file.gestures.len());
        for (identity, command) in file.gestures {
            let kind = parse_command(&command).ok_or_else(|| GestureTableError::UnknownCommand {
                identity: identity.clone(),
                command: command.clone(),
            })?;
            entries.push((identity, kind));
        }
        Self::from_entries(entries)
    }

    pub fn lookup(&self, identity: &str) -> Option<CommandKind> {
        self.entries.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CommandKind)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for GestureTable {
    fn default() -> Self {
        Self::preset(TablePreset::default())
    }
}

fn parse_command(raw: &str) -> Option<CommandKind> {
    [
        CommandKind::ToggleImmersiveSpace,
        CommandKind::SkipNext,
        CommandKind::SkipPrevious,
        CommandKind::TogglePlayPause,
    ]
    .into_iter()
    .find(|kind| kind.as_str() == raw)
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
