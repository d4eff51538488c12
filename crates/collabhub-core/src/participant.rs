//! Participants and roles.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant's role within a session, ordered by privilege.
///
/// `Owner > Writer > Reader`. This ordering is load-bearing: host
/// transfer picks the next host by highest role first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only presence.
    Reader,
    /// May mutate the diagram.
    Writer,
    /// May mutate the diagram and control the session.
    Owner,
}

impl Role {
    /// `true` for roles allowed to submit mutating operations.
    #[must_use]
    pub fn can_mutate(self) -> bool {
        matches!(self, Self::Writer | Self::Owner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Writer => write!(f, "writer"),
            Self::Reader => write!(f, "reader"),
        }
    }
}

/// A connected user within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Internal user id.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Email, if known.
    pub email: Option<String>,
    /// Identity provider (e.g. `"google"`, `"local"`).
    pub provider: String,
    /// Role within this session.
    pub role: Role,
    /// When this participant joined the session.
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Ordering key used for host-transfer tie-breaking: highest role,
    /// then earliest join, then lexicographically smallest user id.
    #[must_use]
    pub fn host_transfer_key(&self) -> (std::cmp::Reverse<Role>, DateTime<Utc>, String) {
        (
            std::cmp::Reverse(self.role),
            self.joined_at,
            self.user_id.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering() {
        assert!(Role::Owner > Role::Writer);
        assert!(Role::Writer > Role::Reader);
    }

    #[test]
    fn reader_cannot_mutate() {
        assert!(!Role::Reader.can_mutate());
        assert!(Role::Writer.can_mutate());
        assert!(Role::Owner.can_mutate());
    }

    #[test]
    fn host_transfer_prefers_writer_over_reader_by_join_order() {
        let now = Utc::now();
        let bob = Participant {
            user_id: UserId::new(),
            display_name: "Bob".into(),
            email: None,
            provider: "local".into(),
            role: Role::Writer,
            joined_at: now + chrono::Duration::seconds(1),
        };
        let carol = Participant {
            user_id: UserId::new(),
            display_name: "Carol".into(),
            email: None,
            provider: "local".into(),
            role: Role::Reader,
            joined_at: now + chrono::Duration::seconds(2),
        };
        let mut candidates = vec![carol.host_transfer_key(), bob.host_transfer_key()];
        candidates.sort();
        // Bob (writer) sorts first because Reverse(Role) makes the higher
        // role compare smaller.
        assert_eq!(candidates[0].0, std::cmp::Reverse(Role::Writer));
    }
}
