//! Room state: the member table and the round state machine.
//!
//! A [`Room`] is plain data. It has no channels and no locks; the room
//! actor owns exactly one and is the only thing that ever mutates it. That
//! keeps every rule here testable without a runtime.
//!
//! ```text
//!            start (draw topics, pick ghost)
//!  Standby ───────────────────────────────→ Battle
//!     ↑                                        │
//!     └────────────────────────────────────────┘
//!            end (clear votes/judges, Battle → Join)
//! ```

use std::collections::BTreeMap;

use ghosthunt_protocol::{
    MemberStatus, Participation, RoomStatus, RoundState, Snapshot,
};
use rand::Rng;

use crate::{RoomError, Team, TopicDeck, User};

/// One game room.
///
/// Members are keyed by display name in a `BTreeMap`, so every listing
/// (and every snapshot) comes out sorted by name.
#[derive(Debug)]
pub struct Room {
    name: String,
    /// Kept for completeness; nothing ever checks it.
    password: String,
    members: BTreeMap<String, User>,
    round: RoundState,
    /// Majority and minority topic of the current round. Both empty
    /// outside a round.
    topic_a: String,
    topic_b: String,
}

impl Room {
    /// Creates a room in `Standby` with `founder` as its only member.
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        founder: User,
    ) -> Self {
        let mut members = BTreeMap::new();
        members.insert(founder.name.clone(), founder);
        Self {
            name: name.into(),
            password: password.into(),
            members,
            round: RoundState::Standby,
            topic_a: String::new(),
            topic_b: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    /// The `(a, b)` topics of the current round, empty in `Standby`.
    pub fn topics(&self) -> (&str, &str) {
        (&self.topic_a, &self.topic_b)
    }

    pub fn member(&self, name: &str) -> Option<&User> {
        self.members.get(name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut User> {
        self.members.get_mut(name)
    }

    /// Members in name order.
    pub fn members(&self) -> impl Iterator<Item = &User> {
        self.members.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds a member.
    ///
    /// # Errors
    /// Returns [`RoomError::NameTaken`] if the display name is in use.
    pub fn add_member(&mut self, user: User) -> Result<(), RoomError> {
        if self.members.contains_key(&user.name) {
            return Err(RoomError::NameTaken {
                room: self.name.clone(),
                user: user.name,
            });
        }
        self.members.insert(user.name.clone(), user);
        Ok(())
    }

    /// Removes a member and returns it. Votes other members cast for it
    /// stay as they are; they simply name nobody any more.
    pub fn remove_member(&mut self, name: &str) -> Option<User> {
        self.members.remove(name)
    }

    /// Starts a round.
    ///
    /// Draws a topic pair, flips a coin for which side is the majority,
    /// then moves every `Join` member into `Battle`. Exactly one of them,
    /// chosen uniformly, becomes the ghost. `Watch` members are untouched.
    ///
    /// Returns `false` (and changes nothing) if a round is already running
    /// or the deck is empty.
    pub fn start_round<R: Rng + ?Sized>(
        &mut self,
        deck: &TopicDeck,
        rng: &mut R,
    ) -> bool {
        if self.round == RoundState::Battle {
            return false;
        }
        let Some(pair) = deck.draw(rng) else {
            tracing::warn!(room = %self.name, "no topics loaded, round not started");
            return false;
        };

        let (majority, minority) = if rng.random_bool(0.5) {
            (pair.b(), pair.a())
        } else {
            (pair.a(), pair.b())
        };
        self.topic_a = majority.to_owned();
        self.topic_b = minority.to_owned();

        let players = self
            .members
            .values()
            .filter(|m| m.participation == Participation::Join)
            .count();
        let ghost = (players > 0).then(|| rng.random_range(0..players));

        for (idx, member) in self
            .members
            .values_mut()
            .filter(|m| m.participation == Participation::Join)
            .enumerate()
        {
            member.participation = Participation::Battle;
            member.team = if Some(idx) == ghost {
                Team::Ghost
            } else {
                Team::Normal
            };
        }

        self.round = RoundState::Battle;
        tracing::info!(room = %self.name, players, "round started");
        true
    }

    /// Ends the round.
    ///
    /// Clears the topics and returns every `Battle` member to `Join`,
    /// clearing their vote and judge flag. Teams are left as they were.
    /// Returns `false` if the room is already in `Standby`.
    pub fn end_round(&mut self) -> bool {
        if self.round == RoundState::Standby {
            return false;
        }
        self.topic_a.clear();
        self.topic_b.clear();
        for member in self.members.values_mut().filter(|m| m.in_battle()) {
            member.participation = Participation::Join;
            member.vote.clear();
            member.judge = false;
        }
        self.round = RoundState::Standby;
        tracing::info!(room = %self.name, "round ended");
        true
    }

    /// Public state of the room itself.
    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            roomname: self.name.clone(),
            state: self.round,
            a: self.topic_a.clone(),
            b: self.topic_b.clone(),
        }
    }

    /// Public state of every member, in name order.
    pub fn member_statuses(&self) -> Vec<MemberStatus> {
        self.members.values().map(User::status).collect()
    }

    /// The room as seen by `viewer`. `None` if `viewer` is not a member.
    pub fn snapshot(&self, viewer: &str) -> Option<Snapshot> {
        let user_state = self.members.get(viewer)?.status();
        Some(Snapshot {
            user_state,
            room_state: self.status(),
            members: self.member_statuses(),
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use ghosthunt_protocol::SessionToken;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn deck() -> TopicDeck {
        TopicDeck::parse("cat,dog\nsea,lake\nsun,moon").unwrap()
    }

    fn token(name: &str) -> SessionToken {
        SessionToken::new(format!("token-{name}"))
    }

    /// Alice founds the room (Join); everyone else enters (Watch).
    fn room_with(names: &[&str]) -> Room {
        let mut room = Room::new("R", "pw", User::founder(names[0], token(names[0])));
        for &name in &names[1..] {
            room.add_member(User::newcomer(name, token(name))).unwrap();
        }
        room
    }

    fn set_join(room: &mut Room, name: &str) {
        room.member_mut(name).unwrap().participation = Participation::Join;
    }

    fn ghosts(room: &Room) -> Vec<&str> {
        room.members()
            .filter(|m| m.in_battle() && m.team == Team::Ghost)
            .map(|m| m.name.as_str())
            .collect()
    }

    #[test]
    fn test_new_room_is_standby_with_founder() {
        let room = room_with(&["Alice"]);
        assert_eq!(room.round(), RoundState::Standby);
        assert_eq!(room.len(), 1);
        assert_eq!(room.member("Alice").unwrap().participation, Participation::Join);
        assert_eq!(room.topics(), ("", ""));
        assert_eq!(room.password(), "pw");
    }

    #[test]
    fn test_add_member_duplicate_name_fails() {
        let mut room = room_with(&["Alice"]);
        let result = room.add_member(User::newcomer("Alice", token("x")));
        assert!(matches!(result, Err(RoomError::NameTaken { .. })));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_members_are_listed_in_name_order() {
        let room = room_with(&["Mallory", "Carol", "Alice", "Bob"]);
        let names: Vec<_> = room.members().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol", "Mallory"]);
    }

    #[test]
    fn test_start_round_moves_only_join_members_to_battle() {
        let mut room = room_with(&["Alice", "Bob", "Carol"]);
        set_join(&mut room, "Bob");
        let mut rng = StdRng::seed_from_u64(1);

        assert!(room.start_round(&deck(), &mut rng));

        assert_eq!(room.round(), RoundState::Battle);
        assert!(room.member("Alice").unwrap().in_battle());
        assert!(room.member("Bob").unwrap().in_battle());
        assert_eq!(room.member("Carol").unwrap().participation, Participation::Watch);
    }

    #[test]
    fn test_start_round_picks_exactly_one_ghost_among_players() {
        for seed in 0..50 {
            let mut room = room_with(&["Alice", "Bob", "Carol", "Dave"]);
            set_join(&mut room, "Bob");
            set_join(&mut room, "Carol");
            let mut rng = StdRng::seed_from_u64(seed);

            room.start_round(&deck(), &mut rng);

            let ghosts = ghosts(&room);
            assert_eq!(ghosts.len(), 1, "seed {seed}");
            assert_ne!(ghosts[0], "Dave", "a spectator can never be the ghost");
        }
    }

    #[test]
    fn test_start_round_every_player_can_be_ghost() {
        let mut seen = std::collections::HashSet::new();
        for seed in 0..200 {
            let mut room = room_with(&["Alice", "Bob", "Carol"]);
            set_join(&mut room, "Bob");
            set_join(&mut room, "Carol");
            let mut rng = StdRng::seed_from_u64(seed);
            room.start_round(&deck(), &mut rng);
            seen.insert(ghosts(&room)[0].to_owned());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_start_round_topics_are_a_deck_pair() {
        let deck = deck();
        for seed in 0..20 {
            let mut room = room_with(&["Alice"]);
            let mut rng = StdRng::seed_from_u64(seed);
            room.start_round(&deck, &mut rng);

            let (a, b) = room.topics();
            assert_ne!(a, b);
            assert!(deck.pairs().iter().any(|p| p.matches(a, b)));
        }
    }

    #[test]
    fn test_start_round_swaps_sides_sometimes() {
        let deck = TopicDeck::parse("cat,dog").unwrap();
        let mut majorities = std::collections::HashSet::new();
        for seed in 0..50 {
            let mut room = room_with(&["Alice"]);
            let mut rng = StdRng::seed_from_u64(seed);
            room.start_round(&deck, &mut rng);
            majorities.insert(room.topics().0.to_owned());
        }
        assert_eq!(majorities.len(), 2);
    }

    #[test]
    fn test_start_round_during_battle_is_noop() {
        let mut room = room_with(&["Alice", "Bob"]);
        let mut rng = StdRng::seed_from_u64(3);
        room.start_round(&deck(), &mut rng);
        let topics = (room.topics().0.to_owned(), room.topics().1.to_owned());
        set_join(&mut room, "Bob");

        assert!(!room.start_round(&deck(), &mut rng));

        assert_eq!(room.topics(), (topics.0.as_str(), topics.1.as_str()));
        assert_eq!(room.member("Bob").unwrap().participation, Participation::Join);
    }

    #[test]
    fn test_start_round_with_empty_deck_is_noop() {
        let mut room = room_with(&["Alice"]);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!room.start_round(&TopicDeck::default(), &mut rng));
        assert_eq!(room.round(), RoundState::Standby);
        assert_eq!(room.member("Alice").unwrap().participation, Participation::Join);
    }

    #[test]
    fn test_start_round_with_only_spectators_has_no_ghost() {
        let mut room = room_with(&["Alice", "Bob"]);
        room.member_mut("Alice").unwrap().participation = Participation::Watch;
        let mut rng = StdRng::seed_from_u64(3);

        assert!(room.start_round(&deck(), &mut rng));

        assert_eq!(room.round(), RoundState::Battle);
        assert!(ghosts(&room).is_empty());
    }

    #[test]
    fn test_end_round_resets_votes_judges_and_participation() {
        let mut room = room_with(&["Alice", "Bob", "Carol"]);
        set_join(&mut room, "Bob");
        let mut rng = StdRng::seed_from_u64(9);
        room.start_round(&deck(), &mut rng);
        room.member_mut("Alice").unwrap().vote = "Bob".into();
        room.member_mut("Bob").unwrap().judge = true;
        let teams: Vec<_> = room.members().map(|m| m.team).collect();

        assert!(room.end_round());

        assert_eq!(room.round(), RoundState::Standby);
        assert_eq!(room.topics(), ("", ""));
        for member in room.members() {
            assert!(member.vote.is_empty());
            assert!(!member.judge);
            assert_ne!(member.participation, Participation::Battle);
        }
        assert_eq!(room.member("Alice").unwrap().participation, Participation::Join);
        assert_eq!(room.member("Carol").unwrap().participation, Participation::Watch);
        let after: Vec<_> = room.members().map(|m| m.team).collect();
        assert_eq!(teams, after, "teams survive the end of a round");
    }

    #[test]
    fn test_end_round_leaves_spectator_untouched() {
        let mut room = room_with(&["Alice", "Bob"]);
        let mut rng = StdRng::seed_from_u64(9);
        room.start_round(&deck(), &mut rng);
        // Alice walks out mid-round with her vote still cast.
        room.member_mut("Alice").unwrap().vote = "Bob".into();
        room.member_mut("Alice").unwrap().participation = Participation::Watch;

        room.end_round();

        let alice = room.member("Alice").unwrap();
        assert_eq!(alice.participation, Participation::Watch);
        assert_eq!(alice.vote, "Bob");
    }

    #[test]
    fn test_end_round_in_standby_is_noop() {
        let mut room = room_with(&["Alice"]);
        room.member_mut("Alice").unwrap().vote = "x".into();
        assert!(!room.end_round());
        assert_eq!(room.member("Alice").unwrap().vote, "x");
    }

    #[test]
    fn test_snapshot_reports_viewer_and_sorted_members() {
        let room = room_with(&["Carol", "Alice"]);
        let snapshot = room.snapshot("Alice").unwrap();

        assert_eq!(snapshot.user_state.username, "Alice");
        assert_eq!(snapshot.room_state.roomname, "R");
        assert_eq!(snapshot.room_state.state, RoundState::Standby);
        let names: Vec<_> = snapshot.members.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, ["Alice", "Carol"]);
    }

    #[test]
    fn test_snapshot_for_non_member_is_none() {
        let room = room_with(&["Alice"]);
        assert!(room.snapshot("Bob").is_none());
    }

    #[test]
    fn test_remove_member_returns_user() {
        let mut room = room_with(&["Alice", "Bob"]);
        let bob = room.remove_member("Bob").unwrap();
        assert_eq!(bob.name, "Bob");
        assert!(!room.contains("Bob"));
        assert!(room.remove_member("Bob").is_none());
    }
}
