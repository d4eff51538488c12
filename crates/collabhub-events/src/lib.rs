//! Collabhub Events - the in-process event bus the collaboration engine
//! uses to observe its own activity (session lifecycle, accepted
//! mutations, presence, host transfer).
//!
//! This is deliberately distinct from `collabhub_core::EventEmitter`:
//! `EventBus` is an **internal**, typed pub/sub mechanism for in-process
//! observers (tests, the monitoring surface); `EventEmitter` is the
//! **external**, untyped side-effect stream that feeds webhooks and
//! add-on invocations, which this engine does not itself implement.
//! A `DiagramSession` publishes every [`EngineEvent`] to both:
//! the bus for anything watching in-process, and `serde_json::to_value` of
//! the same event to the injected `EventEmitter` for the (out-of-scope)
//! webhook layer.
//!
//! # Example
//!
//! ```rust
//! use collabhub_events::{EventBus, EngineEvent, EventMetadata};
//! use collabhub_core::{DiagramId, SessionId};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(EngineEvent::SessionStarted {
//!     metadata: EventMetadata::new("session"),
//!     diagram_id: DiagramId::new(),
//!     session_id: SessionId::new(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "session_started");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EngineEvent, EventMetadata};
pub use subscriber::{
    EventFilter, EventSubscriber, EventTypeFilter, FilterSubscriber, SubscriberId,
    SubscriberRegistry,
};
