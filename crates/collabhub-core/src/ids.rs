//! Typed identifiers.
//!
//! Newtypes over [`uuid::Uuid`] so a diagram id can never be passed where a
//! user id is expected — the kind of mixup that is easy to make when every
//! identifier is just a `String`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_newtype!(DiagramId, "Identifies a diagram across its lifetime.");
uuid_newtype!(
    SessionId,
    "Identifies a live `DiagramSession`. Opaque to clients."
);
uuid_newtype!(UserId, "Identifies an authenticated user (internal uuid).");

/// A cell identifier. Unlike the other ids this is client-supplied and not a
/// uuid in all cases (clients may mint readable ids like `"N1"`), so it is a
/// thin string wrapper rather than a uuid newtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    /// Wrap a string as a cell id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CellId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CellId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_newtypes_do_not_compare() {
        let d = DiagramId::new();
        let s = SessionId::from_uuid(d.0);
        // Same underlying uuid, but different types — this would not compile:
        // assert_eq!(d, s);
        assert_eq!(d.0, s.0);
    }

    #[test]
    fn cell_id_from_str() {
        let id: CellId = "N1".into();
        assert_eq!(id.to_string(), "N1");
    }
}
