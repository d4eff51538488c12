//! The `Services` aggregate: every external collaborator the engine talks
//! to, bundled into one `Arc`-friendly struct built once at startup and
//! handed to every `DiagramSession` and `BackgroundWorkers` instance.
//!
//! Explicit constructor injection replaces ambient/global mutable state;
//! this mirrors `astrid-gateway`'s
//! `DaemonServer`, which holds every collaborator (`AgentRuntime`, `KvStore`,
//! `CapabilityStore`, ...) as `Arc` fields assembled once in `DaemonServer::new`
//! rather than reached for through statics.

use std::sync::Arc;

use collabhub_config::Config;
use collabhub_core::{AccessChecker, DiagramStore, EventEmitter, UserDirectory, WebhookSubscriptionStore};
use collabhub_events::EventBus;
use collabhub_ratelimit::ApiRateLimiter;

/// Every collaborator the realtime engine depends on, assembled once and
/// shared (via `Arc<Services>`) across every live session and background
/// worker.
pub struct Services {
    /// Resolves a caller's role for a diagram.
    pub access_checker: Arc<dyn AccessChecker>,
    /// Durable diagram snapshot storage.
    pub diagram_store: Arc<dyn DiagramStore>,
    /// Out-of-scope side-effect sink (webhooks, add-ons, audit).
    pub event_emitter: Arc<dyn EventEmitter>,
    /// Webhook subscription rows, aged out by `BackgroundWorkers`.
    pub webhook_store: Arc<dyn WebhookSubscriptionStore>,
    /// Resolves external identities to internal user ids.
    pub user_directory: Arc<dyn UserDirectory>,
    /// Per-user minute/hour API rate limiting.
    pub rate_limiter: Arc<ApiRateLimiter>,
    /// In-process typed event bus for observers within this deployment.
    pub event_bus: EventBus,
    /// Resolved configuration.
    pub config: Config,
}

impl Services {
    /// Assemble the services aggregate from its parts.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        access_checker: Arc<dyn AccessChecker>,
        diagram_store: Arc<dyn DiagramStore>,
        event_emitter: Arc<dyn EventEmitter>,
        webhook_store: Arc<dyn WebhookSubscriptionStore>,
        user_directory: Arc<dyn UserDirectory>,
        rate_limiter: Arc<ApiRateLimiter>,
        event_bus: EventBus,
        config: Config,
    ) -> Self {
        Self {
            access_checker,
            diagram_store,
            event_emitter,
            webhook_store,
            user_directory,
            rate_limiter,
            event_bus,
            config,
        }
    }
}
