//! `Monitor` — the general-purpose watch loop.
//!
//! Every decoded event first refreshes the resource cache and is then
//! fanned out to all subscribers, one event at a time in arrival order.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tracing::{error, info};

use stackwatch_core::{
    CacheError, Connector, DispatchReport, MonitorConfig, ResourceCache, StreamError,
    Subscription, SubscriptionHub,
};

use crate::reader::EventReader;

/// Lifecycle of a [`Monitor`]. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Connecting,
    Streaming,
    Terminated,
}

/// Counters for one monitor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorMetrics {
    pub frames_received: u64,
    pub events_decoded: u64,
    pub decode_errors: u64,
    /// Deliveries skipped under `DeliveryPolicy::DropNewest`.
    pub events_dropped: u64,
}

/// Watches the event stream, caching and redistributing every event.
///
/// Register subscribers before calling [`start`](Monitor::start) if they
/// must not miss the first events.
pub struct Monitor {
    connector: Arc<dyn Connector>,
    config: MonitorConfig,
    hub: SubscriptionHub,
    cache: ResourceCache,
    state: Mutex<MonitorState>,
    metrics: Mutex<MonitorMetrics>,
}

impl Monitor {
    pub fn new(connector: Arc<dyn Connector>, config: MonitorConfig) -> Self {
        let hub = SubscriptionHub::new(config.queue_capacity, config.delivery);
        let cache = ResourceCache::new(config.cache_ttl());
        Self {
            connector,
            config,
            hub,
            cache,
            state: Mutex::new(MonitorState::Idle),
            metrics: Mutex::new(MonitorMetrics::default()),
        }
    }

    pub async fn subscribe(&self) -> Subscription {
        self.hub.subscribe().await
    }

    /// Must not be awaited from the task that drains `subscription` while
    /// its queue may be full; see [`SubscriptionHub`].
    pub async fn unsubscribe(&self, subscription: Subscription) {
        self.hub.unsubscribe(subscription).await
    }

    /// Latest cached snapshot of a resource, read as `T`.
    pub fn get<T: DeserializeOwned>(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<T>, CacheError> {
        self.cache.get(resource_type, resource_id)
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    pub fn state(&self) -> MonitorState {
        *lock(&self.state)
    }

    /// Returns a snapshot of current metrics.
    pub fn metrics(&self) -> MonitorMetrics {
        lock(&self.metrics).clone()
    }

    /// Connect and run the watch loop until a fatal error, which is returned.
    ///
    /// A monitor runs once; later calls return [`StreamError::AlreadyStarted`].
    /// Build a new monitor to reconnect.
    pub async fn start(&self) -> StreamError {
        {
            let mut state = lock(&self.state);
            if *state != MonitorState::Idle {
                return StreamError::AlreadyStarted;
            }
            *state = MonitorState::Connecting;
        }

        let err = match self.run().await {
            Ok(never) => match never {},
            Err(e) => e,
        };
        self.set_state(MonitorState::Terminated);
        error!(error = %err, "monitor terminated");
        err
    }

    async fn run(&self) -> Result<Infallible, StreamError> {
        let frames = self.connector.connect().await?;
        self.set_state(MonitorState::Streaming);
        info!("monitor streaming");

        let sweeper = self.cache.spawn_sweeper(self.config.sweep_interval());
        let result = self.stream(EventReader::new(frames)).await;
        sweeper.abort();
        result
    }

    async fn stream(&self, mut reader: EventReader) -> Result<Infallible, StreamError> {
        loop {
            let next = reader.next_event().await;
            self.sync_reader_metrics(&reader);
            let event = next?;

            self.cache
                .put(&event.resource_type, &event.resource_id, event.snapshot());
            let report = self.hub.dispatch(Arc::new(event)).await;
            self.record_dispatch(report);
        }
    }

    fn sync_reader_metrics(&self, reader: &EventReader) {
        let mut m = lock(&self.metrics);
        m.frames_received = reader.frames_read();
        m.decode_errors = reader.skipped();
    }

    fn record_dispatch(&self, report: DispatchReport) {
        let mut m = lock(&self.metrics);
        m.events_decoded += 1;
        m.events_dropped += report.dropped as u64;
    }

    fn set_state(&self, next: MonitorState) {
        *lock(&self.state) = next;
    }
}

/// The guarded values stay consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
