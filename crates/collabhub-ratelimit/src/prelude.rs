//! Prelude module - commonly used types for convenient import.
//!
//! Use `use collabhub_ratelimit::prelude::*;` to import all essential types.

pub use crate::{
    AddonDecision, AddonRateLimiter, ApiDecision, ApiRateLimiter, Decision, InMemoryOrderedSetStore,
    InvocationStore, RateLimitError, RateLimitResult, SlidingWindowRateLimiter, Tier,
};
