//! Collabhub Test — in-memory test doubles and fixtures for the
//! collaboration engine's external collaborator interfaces.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! collabhub-test.workspace = true
//! ```
//!
//! ```rust
//! use collabhub_test::{FixedAccessChecker, test_node, test_diagram_with};
//! use collabhub_core::{AccessChecker, Role, UserId, DiagramId};
//!
//! # async fn example() {
//! let user = UserId::new();
//! let diagram = test_diagram_with(vec![test_node("N1", 0.0, 0.0)]);
//! let checker = FixedAccessChecker::new().with(user, diagram.id, Role::Owner);
//! assert_eq!(checker.role(user, diagram.id).await, Some(Role::Owner));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;
pub mod prelude;

pub use fixtures::*;
pub use mocks::*;
