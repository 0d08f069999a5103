//! Gesture stream plumbing.

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use shared::{error::GestureSourceError, protocol::RawGestureEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub type GestureEventStream = BoxStream<'static, Result<RawGestureEvent, GestureSourceError>>;

/// Anything that can hand out gesture streams. A finished stream is never
/// resumed; call `events` again for a new one.
pub trait GestureSource: Send + Sync {
    fn events(&self) -> GestureEventStream;
}

/// A stream fed by the returned sender. The stream ends once every sender is
/// dropped.
pub fn channel_source(buffer: usize) -> (mpsc::Sender<RawGestureEvent>, GestureEventStream) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, ReceiverStream::new(rx).map(Ok).boxed())
}

/// A finite stream that yields `events` in order and then ends.
pub fn replay_source(events: Vec<RawGestureEvent>) -> GestureEventStream {
    stream::iter(events.into_iter().map(Ok)).boxed()
}
