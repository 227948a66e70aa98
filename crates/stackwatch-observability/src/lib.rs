//! # stackwatch-observability
//!
//! Structured logging for Stackwatch binaries. Library crates only emit
//! `tracing` events; installing a subscriber is the application's call.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
