use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PackageRef;

/// Metadata declared by a gesture package alongside the gesture itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureMetadata {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One match report from the gesture recogniser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RawGestureEvent {
    Full {
        package_ref: PackageRef,
        name: String,
        #[serde(default)]
        metadata: GestureMetadata,
    },
    Partial {
        package_ref: PackageRef,
        name: String,
        stage: u32,
        #[serde(default)]
        metadata: GestureMetadata,
    },
    Reset {
        package_ref: PackageRef,
        name: String,
        #[serde(default)]
        metadata: GestureMetadata,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Full,
    Partial,
    Reset,
}

impl RawGestureEvent {
    /// A completed match whose metadata description is `description`.
    pub fn full(description: impl Into<String>) -> Self {
        let description = description.into();
        Self::Full {
            package_ref: PackageRef::new(""),
            name: description.clone(),
            metadata: GestureMetadata {
                description,
                title: None,
            },
        }
    }

    pub fn partial(description: impl Into<String>, stage: u32) -> Self {
        let description = description.into();
        Self::Partial {
            package_ref: PackageRef::new(""),
            name: description.clone(),
            stage,
            metadata: GestureMetadata {
                description,
                title: None,
            },
        }
    }

    pub fn reset(description: impl Into<String>) -> Self {
        let description = description.into();
        Self::Reset {
            package_ref: PackageRef::new(""),
            name: description.clone(),
            metadata: GestureMetadata {
                description,
                title: None,
            },
        }
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            Self::Full { .. } => MatchKind::Full,
            Self::Partial { .. } => MatchKind::Partial,
            Self::Reset { .. } => MatchKind::Reset,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Full { name, .. } | Self::Partial { name, .. } | Self::Reset { name, .. } => name,
        }
    }

    pub fn package_ref(&self) -> &PackageRef {
        match self {
            Self::Full { package_ref, .. }
            | Self::Partial { package_ref, .. }
            | Self::Reset { package_ref, .. } => package_ref,
        }
    }

    pub fn metadata(&self) -> &GestureMetadata {
        match self {
            Self::Full { metadata, .. }
            | Self::Partial { metadata, .. }
            | Self::Reset { metadata, .. } => metadata,
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

/// Commands a gesture can be bound to in a gesture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ToggleImmersiveSpace,
    SkipNext,
    SkipPrevious,
    TogglePlayPause,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToggleImmersiveSpace => "toggle_immersive_space",
            Self::SkipNext => "skip_next",
            Self::SkipPrevious => "skip_previous",
            Self::TogglePlayPause => "toggle_play_pause",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticCommand {
    ToggleImmersiveSpace,
    SkipNext,
    SkipPrevious,
    TogglePlayPause,
    Unknown(String),
}

impl SemanticCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleImmersiveSpace => CommandKind::ToggleImmersiveSpace.as_str(),
            Self::SkipNext => CommandKind::SkipNext.as_str(),
            Self::SkipPrevious => CommandKind::SkipPrevious.as_str(),
            Self::TogglePlayPause => CommandKind::TogglePlayPause.as_str(),
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<CommandKind> for SemanticCommand {
    fn from(value: CommandKind) -> Self {
        match value {
            CommandKind::ToggleImmersiveSpace => Self::ToggleImmersiveSpace,
            CommandKind::SkipNext => Self::SkipNext,
            CommandKind::SkipPrevious => Self::SkipPrevious,
            CommandKind::TogglePlayPause => Self::TogglePlayPause,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceTransitionState {
    #[default]
    Closed,
    Open,
    InTransition,
}

impl fmt::Display for SpaceTransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::InTransition => "in_transition",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SpaceOpenOutcome {
    Opened,
    UserCancelled,
    Error(String),
}

/// Lifecycle notifications pushed by the space controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceLifecycleEvent {
    Opened,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    #[default]
    Idle,
    Running,
    Stopped,
    Cancelled,
    Failed,
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    Unclassified {
        identity: String,
    },
    FilteredOut {
        identity: String,
        target: String,
    },
    GuardRejected {
        command: String,
        space_state: SpaceTransitionState,
    },
    NothingToResume,
    SpaceOpenFailed {
        outcome: SpaceOpenOutcome,
    },
    CollaboratorFailed {
        operation: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub recorded_at: DateTime<Utc>,
    pub event: DiagnosticEvent,
}

impl DiagnosticRecord {
    pub fn now(event: DiagnosticEvent) -> Self {
        Self {
            recorded_at: Utc::now(),
            event,
        }
    }
}
