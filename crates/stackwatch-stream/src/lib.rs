//! # stackwatch-stream
//!
//! The two consumers of the platform event socket.
//!
//! ## Architecture
//! ```text
//! Connector (WsConnector or any other frame source)
//!       │
//!       ▼
//! EventReader ── malformed frame → warn + skip
//!       │
//!       ├──────────────────────────────┐
//!       ▼                              ▼
//! Monitor                        StackNarrator
//!   ResourceCache::put             per-level last message
//!   SubscriptionHub::dispatch      "Stack [web]: ..." lines
//!       │
//!       ▼
//! Subscription queues  ← consumers drain at their own pace
//! ```
//!
//! Both loops run until the transport fails and hand that error back to the
//! caller. Nothing reconnects on its own.

pub mod monitor;
pub mod narrator;
pub mod reader;

pub use monitor::{Monitor, MonitorMetrics, MonitorState};
pub use narrator::{StackBinding, StackNarrator};
pub use reader::EventReader;

#[cfg(test)]
pub(crate) mod testing;
