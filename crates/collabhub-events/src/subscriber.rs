//! Synchronous subscriber registry, for callers that want an immediate
//! callback rather than polling an [`crate::bus::EventReceiver`].

use crate::event::EngineEvent;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a registered subscriber so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Something that wants a synchronous callback on every published event.
pub trait EventSubscriber: Send + Sync {
    /// Called once per published event, on the publisher's thread. Must not
    /// block — slow work should hand off to a task instead.
    fn on_event(&self, event: &EngineEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Narrows which events reach a subscriber.
pub trait EventFilter: Send + Sync {
    /// `true` if `event` should be delivered.
    fn matches(&self, event: &EngineEvent) -> bool;
}

/// An `EventFilter` that matches a fixed set of event type tags.
pub struct EventTypeFilter {
    types: Vec<&'static str>,
}

impl EventTypeFilter {
    /// Match only events whose `event_type()` is in `types`.
    #[must_use]
    pub fn new(types: Vec<&'static str>) -> Self {
        Self { types }
    }
}

impl EventFilter for EventTypeFilter {
    fn matches(&self, event: &EngineEvent) -> bool {
        self.types.contains(&event.event_type())
    }
}

/// Wraps an [`EventSubscriber`] so it only receives events an
/// [`EventFilter`] admits.
pub struct FilterSubscriber<S> {
    filter: Box<dyn EventFilter>,
    inner: S,
}

impl<S: EventSubscriber> FilterSubscriber<S> {
    /// Wrap `inner`, gating delivery through `filter`.
    pub fn new(filter: Box<dyn EventFilter>, inner: S) -> Self {
        Self { filter, inner }
    }
}

impl<S: EventSubscriber> EventSubscriber for FilterSubscriber<S> {
    fn on_event(&self, event: &EngineEvent) {
        if self.filter.matches(event) {
            self.inner.on_event(event);
        }
    }
}

/// A concurrent registry of synchronous subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<dyn EventSubscriber>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("count", &self.subscribers.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, returning its id for later removal.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.insert(id, subscriber);
        id
    }

    /// Remove a previously registered subscriber. `false` if it was already
    /// removed.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Notify every registered subscriber.
    pub fn notify(&self, event: &EngineEvent) {
        for entry in &self.subscribers {
            entry.value().on_event(event);
        }
    }

    /// Current subscriber count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// `true` if no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabhub_core::{DiagramId, SessionId};
    use std::sync::atomic::AtomicUsize;

    fn started_event() -> EngineEvent {
        EngineEvent::SessionStarted {
            metadata: crate::event::EventMetadata::new("test"),
            diagram_id: DiagramId::new(),
            session_id: SessionId::new(),
        }
    }

    #[test]
    fn registered_subscriber_is_notified() {
        let registry = SubscriberRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register(Arc::new(move |_: &EngineEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        registry.notify(&started_event());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unregistered_subscriber_stops_receiving() {
        let registry = SubscriberRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = registry.register(Arc::new(move |_: &EngineEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        assert!(registry.unregister(id));
        registry.notify(&started_event());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn filter_narrows_delivery() {
        let registry = SubscriberRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let filter = EventTypeFilter::new(vec!["host_changed"]);
        registry.register(Arc::new(FilterSubscriber::new(
            Box::new(filter),
            move |_: &EngineEvent| {
                counter.fetch_add(1, Ordering::Relaxed);
            },
        )));
        registry.notify(&started_event());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
