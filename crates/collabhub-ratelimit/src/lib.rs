//! Collabhub RateLimit - the sliding-window rate limiters and quota layers
//! that keep the collaboration engine healthy under load.
//!
//! - [`window::SlidingWindowRateLimiter`] is the primitive: a
//!   trim-then-check-then-push pipeline against an
//!   [`collabhub_core::OrderedSetStore`].
//! - [`api::ApiRateLimiter`] layers a per-minute and per-hour check over it,
//!   reading quotas from a [`collabhub_core::QuotaStore`].
//! - [`addon::AddonRateLimiter`] adds a concurrent-invocation cap on top of
//!   that, for add-on/webhook invocations specifically.
//! - [`store::InMemoryOrderedSetStore`] is the in-process implementation used
//!   by tests and single-node deployments.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use collabhub_ratelimit::{SlidingWindowRateLimiter, InMemoryOrderedSetStore};
//!
//! # async fn example() {
//! let store = Arc::new(InMemoryOrderedSetStore::new());
//! let limiter = SlidingWindowRateLimiter::new(store, 60);
//!
//! let decision = limiter.check("user:1", 3, 60, 0).await.unwrap();
//! assert!(decision.is_allowed());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod addon;
pub mod api;
/// Error types and results for rate limiting.
pub mod error;
pub mod store;
pub mod window;

pub use addon::{AddonDecision, AddonRateLimiter, InvocationStore};
pub use api::{ApiDecision, ApiRateLimiter, Tier};
pub use error::{RateLimitError, RateLimitResult};
pub use store::InMemoryOrderedSetStore;
pub use window::{Decision, SlidingWindowRateLimiter};
