//! The `Connector` trait — anything that can open a stream of raw frames.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::StreamError;

/// One raw message as received from the event socket.
pub type Frame = Bytes;

/// An open stream of frames.
///
/// An `Err` item is a fatal transport failure; the stream yields nothing
/// useful after it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, StreamError>> + Send>>;

/// Opens the event stream.
///
/// Each call to [`connect`](Connector::connect) performs a fresh handshake;
/// nothing is retried internally.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Resolve the endpoint, perform the upgrade and return the frame stream.
    async fn connect(&self) -> Result<FrameStream, StreamError>;
}
