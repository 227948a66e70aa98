//! Scripted frame sources for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use stackwatch_core::{Connector, Frame, FrameStream, StreamError};

/// A frame stream that yields `texts` and then ends.
pub fn frames(texts: &[&str]) -> FrameStream {
    let items: Vec<Result<Frame, StreamError>> = texts
        .iter()
        .map(|t| Ok(Bytes::from(t.to_string())))
        .collect();
    Box::pin(futures::stream::iter(items))
}

/// Hands out one scripted stream, then refuses further connects.
pub struct ScriptedConnector {
    frames: Mutex<Option<FrameStream>>,
}

impl ScriptedConnector {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            frames: Mutex::new(Some(frames(texts))),
        }
    }

    /// Yields `texts`, then stays open without producing anything.
    pub fn hanging(texts: &[&str]) -> Self {
        use futures::StreamExt;
        let stream = frames(texts).chain(futures::stream::pending());
        Self {
            frames: Mutex::new(Some(Box::pin(stream))),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<FrameStream, StreamError> {
        self.frames
            .lock()
            .unwrap()
            .take()
            .ok_or(StreamError::Unauthorized)
    }
}

/// Always fails the handshake with the given status.
pub struct RejectingConnector(pub u16);

#[async_trait]
impl Connector for RejectingConnector {
    async fn connect(&self) -> Result<FrameStream, StreamError> {
        Err(StreamError::Handshake {
            status: self.0,
            reason: "OK".into(),
        })
    }
}
