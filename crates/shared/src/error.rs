use thiserror::Error;

/// Faults raised by a gesture source. These end the driver that consumes them.
#[derive(Debug, Error)]
pub enum GestureSourceError {
    #[error("gesture source i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed gesture event on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("gesture source failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum GestureTableError {
    #[error("failed to parse gesture table: {0}")]
    Parse(String),
    #[error("gesture table entry has an empty identity")]
    EmptyIdentity,
    #[error("unknown command '{command}' for gesture '{identity}'")]
    UnknownCommand { identity: String, command: String },
    #[error("gesture table is empty")]
    Empty,
    #[error("unknown gesture table preset '{0}'")]
    UnknownPreset(String),
}
