//! `StackNarrator` — human-readable progress for one named stack.
//!
//! The narrator keeps its own connection to the event socket. It learns the
//! stack's id from the first `stack` event carrying the watched name; until
//! then service and container events cannot be attributed and are ignored.
//! Each level (stack, service, container) remembers the last line it
//! printed so repeated updates are not printed twice.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use stackwatch_core::{
    Connector, ContainerView, Event, ResourceKind, ServiceView, StackView, StreamError, Transition,
};

use crate::reader::EventReader;

/// Whether the watched stack's id is known yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StackBinding {
    #[default]
    Unbound,
    Bound(String),
}

impl StackBinding {
    /// `true` if bound to exactly `stack_id`.
    pub fn matches(&self, stack_id: &str) -> bool {
        matches!(self, Self::Bound(id) if id == stack_id)
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Unbound => None,
            Self::Bound(id) => Some(id),
        }
    }
}

#[derive(Debug, Default)]
struct LastLines {
    stack: Option<String>,
    service: Option<String>,
    container: Option<String>,
}

/// Narrates the transitions of one stack, its services and their containers.
pub struct StackNarrator {
    connector: Arc<dyn Connector>,
    stack_name: String,
    binding: StackBinding,
    service_ids: BTreeSet<String>,
    last: LastLines,
}

impl StackNarrator {
    pub fn new(connector: Arc<dyn Connector>, stack_name: impl Into<String>) -> Self {
        Self {
            connector,
            stack_name: stack_name.into(),
            binding: StackBinding::Unbound,
            service_ids: BTreeSet::new(),
            last: LastLines::default(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn binding(&self) -> &StackBinding {
        &self.binding
    }

    /// Service ids the watched stack has reported so far.
    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.service_ids.iter().map(String::as_str)
    }

    /// Connect and narrate until the transport fails; the error is returned.
    ///
    /// `emit` receives each progress line as it is produced.
    pub async fn run<F>(&mut self, mut emit: F) -> StreamError
    where
        F: FnMut(String) + Send,
    {
        let frames = match self.connector.connect().await {
            Ok(frames) => frames,
            Err(e) => return e,
        };
        info!(stack = %self.stack_name, "watching stack transitions");

        let mut reader = EventReader::new(frames);
        loop {
            match reader.next_event().await {
                Ok(event) => {
                    if let Some(line) = self.observe(&event) {
                        emit(line);
                    }
                }
                Err(e) => return e,
            }
        }
    }

    /// Feed one event. Returns the line to print, if any.
    pub fn observe(&mut self, event: &Event) -> Option<String> {
        match event.kind() {
            ResourceKind::Stack => self.observe_stack(event),
            ResourceKind::Service => {
                let service: ServiceView = decode(event)?;
                if !self.binding.matches(&service.stack_id) {
                    return None;
                }
                narrate(&mut self.last.service, "Service", &service)
            }
            ResourceKind::Container => {
                let container: ContainerView = decode(event)?;
                if !self.binding.matches(&container.stack_id) {
                    return None;
                }
                narrate(&mut self.last.container, "Container", &container)
            }
            ResourceKind::Other(_) => None,
        }
    }

    fn observe_stack(&mut self, event: &Event) -> Option<String> {
        let stack: StackView = decode(event)?;
        if stack.name != self.stack_name {
            return None;
        }

        // bound once; later id changes are not followed
        if self.binding == StackBinding::Unbound && !stack.id.is_empty() {
            debug!(stack = %stack.name, id = %stack.id, "resolved stack id");
            self.binding = StackBinding::Bound(stack.id.clone());
        }
        self.service_ids.extend(stack.service_ids.iter().cloned());

        narrate(&mut self.last.stack, "Stack", &stack)
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &Event) -> Option<T> {
    match event.decode_resource() {
        Ok(view) => Some(view),
        Err(e) => {
            warn!(error = %e, resource_id = %event.resource_id, "skipping resource");
            None
        }
    }
}

/// Format the line for a transitioning entity, unless it repeats `last`.
fn narrate<T: Transition>(last: &mut Option<String>, label: &str, entity: &T) -> Option<String> {
    if !entity.is_transitioning() {
        return None;
    }
    let line = format!(
        "{label} [{}]: {}",
        entity.name(),
        entity.transitioning_message()
    );
    if last.as_deref() == Some(line.as_str()) {
        return None;
    }
    *last = Some(line.clone());
    Some(line)
}
