//! Error types for the event pipeline.
//!
//! [`StreamError`] is always fatal for the watch loop that hits it.
//! [`DecodeError`] is reported and skipped. [`CacheError`] only concerns the
//! caller of [`ResourceCache::get`](crate::ResourceCache::get).

use thiserror::Error;

/// Fatal errors that end a watch or narration session.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The session does not expose the `subscribe` capability.
    #[error("not authorized to subscribe")]
    Unauthorized,

    /// The capability link could not be turned into a stream URL.
    #[error("invalid subscribe link '{link}': {reason}")]
    InvalidUrl { link: String, reason: String },

    /// The server answered the upgrade with something other than 101.
    #[error("bad response code while opening event stream: {status} {reason}")]
    Handshake { status: u16, reason: String },

    /// The connection failed after a successful handshake.
    #[error("WebSocket error: {0}")]
    Transport(String),

    /// `start` was called on a loop that already ran.
    #[error("watch loop already started")]
    AlreadyStarted,
}

impl StreamError {
    /// Returns `true` if the upgrade handshake was rejected.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Handshake { .. })
    }

    /// Returns `true` if an established connection failed or closed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors decoding a frame or one of its nested resources.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed event frame: {0}")]
    Frame(#[source] serde_json::Error),

    #[error("malformed {kind} resource: {source}")]
    Resource {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} event carries no resource")]
    MissingResource { kind: String },
}

/// Errors reading from the resource cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The stored payload does not fit the requested type.
    #[error("cached value for '{key}' has an unexpected shape: {source}")]
    Coercion {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
