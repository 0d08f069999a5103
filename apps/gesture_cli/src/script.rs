//! Scripted gesture source: one JSON value per line, from a file or stdin.
//!
//! Lines are either a gesture event (`{"type":"full","payload":{..}}`) or a
//! directive (`{"type":"wait","payload":{"ms":500}}`, `{"type":"dismiss_space"}`).
//! Blank lines and lines starting with `#` are skipped.

use std::{path::PathBuf, sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use gesture_core::{GestureEventStream, GestureSource};
use serde::Deserialize;
use shared::{error::GestureSourceError, protocol::RawGestureEvent};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::debug;

use crate::sim::SimulatedSpace;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
enum Directive {
    Wait { ms: u64 },
    DismissSpace,
}

#[derive(Debug)]
enum ScriptLine {
    Gesture(RawGestureEvent),
    Directive(Directive),
    Blank,
}

fn parse_line(line_no: usize, line: &str) -> Result<ScriptLine, GestureSourceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(ScriptLine::Blank);
    }
    if let Ok(directive) = serde_json::from_str::<Directive>(trimmed) {
        return Ok(ScriptLine::Directive(directive));
    }
    serde_json::from_str::<RawGestureEvent>(trimmed)
        .map(ScriptLine::Gesture)
        .map_err(|source| GestureSourceError::Malformed {
            line: line_no,
            source,
        })
}

pub struct ScriptGestureSource {
    path: Option<PathBuf>,
    space: Arc<SimulatedSpace>,
}

impl ScriptGestureSource {
    /// `None` reads from stdin.
    pub fn new(path: Option<PathBuf>, space: Arc<SimulatedSpace>) -> Self {
        Self { path, space }
    }
}

async fn open_reader(path: Option<PathBuf>) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    Ok(match path {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    })
}

async fn run_line(
    line_no: usize,
    line: std::io::Result<String>,
    space: &SimulatedSpace,
) -> Option<Result<RawGestureEvent, GestureSourceError>> {
    let line = match line {
        Ok(line) => line,
        Err(err) => return Some(Err(GestureSourceError::Io(err))),
    };
    match parse_line(line_no, &line) {
        Ok(ScriptLine::Gesture(event)) => Some(Ok(event)),
        Ok(ScriptLine::Directive(Directive::Wait { ms })) => {
            debug!(ms, "script wait");
            tokio::time::sleep(Duration::from_millis(ms)).await;
            None
        }
        Ok(ScriptLine::Directive(Directive::DismissSpace)) => {
            space.dismiss();
            None
        }
        Ok(ScriptLine::Blank) => None,
        Err(err) => Some(Err(err)),
    }
}

impl GestureSource for ScriptGestureSource {
    fn events(&self) -> GestureEventStream {
        let path = self.path.clone();
        let space = Arc::clone(&self.space);

        stream::once(open_reader(path))
            .flat_map(move |opened| match opened {
                Ok(reader) => {
                    let space = Arc::clone(&space);
                    LinesStream::new(BufReader::new(reader).lines())
                        .enumerate()
                        .filter_map(move |(index, line)| {
                            let space = Arc::clone(&space);
                            async move { run_line(index + 1, line, &space).await }
                        })
                        .boxed()
                }
                Err(err) => stream::iter([Err(GestureSourceError::Io(err))]).boxed(),
            })
            .boxed()
    }
}

#[cfg(test)]
#[path = "tests/script_tests.rs"]
mod tests;
