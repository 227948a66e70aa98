//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hub::{DeliveryPolicy, DEFAULT_QUEUE_CAPACITY};

/// Tuning for the watch loop's hub and cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Per-subscriber queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Behavior when a subscriber's queue is full.
    #[serde(default)]
    pub delivery: DeliveryPolicy,
    /// Lifetime of a cache entry after its last write, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// How often expired cache entries are reclaimed, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }
fn default_cache_ttl_secs() -> u64 { 300 }
fn default_sweep_interval_secs() -> u64 { 30 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            delivery: DeliveryPolicy::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sweep interval, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
