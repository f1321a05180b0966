//! Room members.

use ghosthunt_protocol::{MemberStatus, Participation, SessionToken};
use ghosthunt_transport::ConnectionId;

/// Which side of the round a member is on.
///
/// Only meaningful while the member is in `Battle`. It is deliberately not
/// reset when a round ends, so a member keeps their last assignment until
/// the next draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Team {
    /// Holds the majority topic.
    #[default]
    Normal,
    /// Holds the minority topic.
    Ghost,
}

impl Team {
    /// Wire value: 0 for the majority, 1 for the ghost.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Ghost => 1,
        }
    }
}

/// One participant of a room.
///
/// Owned by its room; only the command processor running inside the room
/// actor mutates it.
#[derive(Debug, Clone)]
pub struct User {
    /// Display name, unique within the room.
    pub name: String,
    /// The session token that admitted this member. Commands carrying any
    /// other token for the same name are refused.
    pub id: SessionToken,
    /// Name of the suspected ghost, or empty.
    pub vote: String,
    /// Set once the member declares the round resolved.
    pub judge: bool,
    pub team: Team,
    /// The live push connection, if one is attached.
    pub connection: Option<ConnectionId>,
    pub participation: Participation,
}

impl User {
    fn with_participation(
        name: impl Into<String>,
        id: SessionToken,
        participation: Participation,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            vote: String::new(),
            judge: false,
            team: Team::Normal,
            connection: None,
            participation,
        }
    }

    /// The member who creates the room. Starts eligible for the first
    /// round.
    pub fn founder(name: impl Into<String>, id: SessionToken) -> Self {
        Self::with_participation(name, id, Participation::Join)
    }

    /// A member entering an existing room. Starts as a spectator.
    pub fn newcomer(name: impl Into<String>, id: SessionToken) -> Self {
        Self::with_participation(name, id, Participation::Watch)
    }

    /// Returns `true` if this member is playing the current round.
    pub fn in_battle(&self) -> bool {
        self.participation == Participation::Battle
    }

    /// Public view of this member.
    pub fn status(&self) -> MemberStatus {
        MemberStatus {
            username: self.name.clone(),
            vote: self.vote.clone(),
            judge: self.judge,
            team: self.team.as_u8(),
            state: self.participation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SessionToken {
        SessionToken::new("t")
    }

    #[test]
    fn test_founder_starts_in_join() {
        let user = User::founder("Alice", token());
        assert_eq!(user.participation, Participation::Join);
        assert!(user.connection.is_none());
    }

    #[test]
    fn test_newcomer_starts_in_watch() {
        let user = User::newcomer("Bob", token());
        assert_eq!(user.participation, Participation::Watch);
    }

    #[test]
    fn test_status_reflects_fields() {
        let mut user = User::founder("Alice", token());
        user.vote = "Bob".into();
        user.judge = true;
        user.team = Team::Ghost;
        user.participation = Participation::Battle;

        let status = user.status();
        assert_eq!(status.username, "Alice");
        assert_eq!(status.vote, "Bob");
        assert!(status.judge);
        assert_eq!(status.team, 1);
        assert_eq!(status.state, Participation::Battle);
    }
}
