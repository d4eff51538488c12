//! Convenience re-exports.

pub use crate::{
    FixedAccessChecker, FixedInvocationStore, FixedQuotaStore, InMemoryDiagramStore,
    InMemoryUserDirectory, InMemoryWebhookSubscriptionStore, RecordingEventEmitter, test_diagram,
    test_diagram_with, test_edge, test_node, test_participant,
};
