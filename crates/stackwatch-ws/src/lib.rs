//! stackwatch-ws — opens the platform's event socket.
//!
//! # Flow
//! 1. Ask the [`Session`] for its `subscribe` capability
//!    (missing → [`StreamError::Unauthorized`](stackwatch_core::StreamError::Unauthorized))
//! 2. Rewrite the collection link to `ws`/`wss` and add the `eventNames` filter
//! 3. Upgrade; anything other than `101 Switching Protocols` is a handshake error
//! 4. Yield text and binary messages as frames until the socket fails or closes

pub mod connector;
pub mod session;

pub use connector::{build_stream_url, check_upgrade, WsConnector, DEFAULT_EVENT_NAMES, SUBSCRIBE_CAPABILITY};
pub use session::{Capability, Session, StaticSession};
