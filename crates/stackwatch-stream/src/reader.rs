//! `EventReader` — pulls decoded events off a frame stream.

use futures::StreamExt;
use tracing::{debug, warn};

use stackwatch_core::{decode_frame, Event, FrameStream, StreamError};

/// Decodes frames in arrival order, skipping the ones that do not decode.
pub struct EventReader {
    frames: FrameStream,
    frames_read: u64,
    skipped: u64,
}

impl EventReader {
    pub fn new(frames: FrameStream) -> Self {
        Self {
            frames,
            frames_read: 0,
            skipped: 0,
        }
    }

    /// Next decodable event.
    ///
    /// Malformed frames are logged and skipped. A transport failure, or the
    /// stream ending, is returned as a fatal error.
    pub async fn next_event(&mut self) -> Result<Event, StreamError> {
        loop {
            let frame = match self.frames.next().await {
                Some(frame) => frame?,
                None => return Err(StreamError::Transport("event stream ended".into())),
            };
            self.frames_read += 1;
            match decode_frame(&frame) {
                Ok(event) => {
                    debug!(
                        name = %event.name,
                        resource_type = %event.resource_type,
                        resource_id = %event.resource_id,
                        "event"
                    );
                    return Ok(event);
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!(error = %e, len = frame.len(), "skipping undecodable frame");
                }
            }
        }
    }

    /// Frames pulled off the stream so far, decodable or not.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Frames dropped because they did not decode.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
