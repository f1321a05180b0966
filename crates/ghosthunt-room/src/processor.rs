//! The command processor: one [`GameRequest`] in, one [`GameResponse`] out.
//!
//! This is a pure function over a [`Room`]. It runs inside the room actor,
//! so commands against one room are applied strictly one at a time and
//! every response reflects exactly the state its command left behind.
//!
//! Failed preconditions never error. The command still answers with a
//! fresh snapshot and reports [`Outcome::Ignored`]. The only error is a
//! caller who is not a member of the room.

use ghosthunt_protocol::{
    GameRequest, GameResponse, Outcome, Participation, ResponseMeta,
};
use rand::Rng;

use crate::{Room, RoomError, TopicDeck, User};

/// The recognized in-round commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read-only refresh.
    Update,
    /// Begin a round.
    Start,
    /// Finish the round.
    End,
    /// Become eligible for the next round.
    Join,
    /// Become a spectator.
    Watch,
    /// Name the suspected ghost.
    Vote,
    /// Declare the round resolved.
    Judge,
    /// Reserved; always a no-op.
    Extend,
    /// Leave the room.
    Exit,
}

impl Command {
    /// Parses a command name. Matching is exact and case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name {
            "update" => Self::Update,
            "start" => Self::Start,
            "end" => Self::End,
            "join" => Self::Join,
            "watch" => Self::Watch,
            "vote" => Self::Vote,
            "judge" => Self::Judge,
            "extend" => Self::Extend,
            "exit" => Self::Exit,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Start => "start",
            Self::End => "end",
            Self::Join => "join",
            Self::Watch => "watch",
            Self::Vote => "vote",
            Self::Judge => "judge",
            Self::Extend => "extend",
            Self::Exit => "exit",
        }
    }
}

/// What one command did.
#[derive(Debug)]
pub struct Processed {
    pub response: GameResponse,
    /// The member removed by `exit`, if any.
    pub departed: Option<User>,
}

/// Applies `request` on behalf of `caller`.
///
/// The response echoes the command name exactly as received.
///
/// # Errors
/// Returns [`RoomError::NotInRoom`] if `caller` is not a member. This is
/// checked before the command name, so even an unknown command from a
/// stranger is refused.
pub fn process<R: Rng + ?Sized>(
    room: &mut Room,
    deck: &TopicDeck,
    rng: &mut R,
    caller: &str,
    request: &GameRequest,
) -> Result<Processed, RoomError> {
    if !room.contains(caller) {
        return Err(RoomError::NotInRoom {
            room: room.name().to_owned(),
            user: caller.to_owned(),
        });
    }

    let Some(command) = Command::parse(&request.command) else {
        tracing::debug!(
            room = %room.name(),
            user = caller,
            command = %request.command,
            "unrecognized command"
        );
        return Ok(Processed {
            response: GameResponse {
                command: request.command.clone(),
                outcome: Outcome::Unrecognized,
                meta: ResponseMeta::Empty {},
            },
            departed: None,
        });
    };

    let applied = match command {
        Command::Exit => return Ok(exit(room, caller, &request.command)),
        Command::Update => true,
        Command::Extend => false,
        Command::Start => room.start_round(deck, rng),
        Command::End => room.end_round(),
        Command::Join => set_participation(room, caller, Participation::Join),
        Command::Watch => set_participation(room, caller, Participation::Watch),
        Command::Vote => vote(room, caller, &request.meta),
        Command::Judge => judge(room, caller),
    };

    tracing::debug!(
        room = %room.name(),
        user = caller,
        command = command.name(),
        applied,
        "command processed"
    );

    let snapshot = room.snapshot(caller).ok_or_else(|| RoomError::NotInRoom {
        room: room.name().to_owned(),
        user: caller.to_owned(),
    })?;

    Ok(Processed {
        response: GameResponse {
            command: request.command.clone(),
            outcome: if applied {
                Outcome::Applied
            } else {
                Outcome::Ignored
            },
            meta: ResponseMeta::Snapshot(snapshot),
        },
        departed: None,
    })
}

/// `exit`: the caller leaves. The response carries only the name, since
/// the caller can no longer see the room.
fn exit(room: &mut Room, caller: &str, command: &str) -> Processed {
    let departed = room.remove_member(caller);
    tracing::info!(
        room = %room.name(),
        user = caller,
        remaining = room.len(),
        "member exited"
    );
    Processed {
        response: GameResponse {
            command: command.to_owned(),
            outcome: Outcome::Applied,
            meta: ResponseMeta::Exit {
                exit_user: caller.to_owned(),
            },
        },
        departed,
    }
}

/// `join`/`watch`: allowed at any time. A player who switches to `watch`
/// mid-round drops out of it; a spectator who switches to `join` waits for
/// the next one.
fn set_participation(room: &mut Room, caller: &str, to: Participation) -> bool {
    match room.member_mut(caller) {
        Some(member) => {
            member.participation = to;
            true
        }
        None => false,
    }
}

/// `vote`: a player names another current member.
fn vote(room: &mut Room, caller: &str, target: &str) -> bool {
    if target == caller || !room.contains(target) {
        return false;
    }
    match room.member_mut(caller) {
        Some(member) if member.in_battle() => {
            member.vote = target.to_owned();
            true
        }
        _ => false,
    }
}

/// `judge`: a player declares the round resolved. Idempotent.
fn judge(room: &mut Room, caller: &str) -> bool {
    match room.member_mut(caller) {
        Some(member) if member.in_battle() => {
            member.judge = true;
            true
        }
        _ => false,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming follows `test_{command}_{scenario}_{expected}`.

    use ghosthunt_protocol::{RoundState, SessionToken};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    struct Fixture {
        room: Room,
        deck: TopicDeck,
        rng: StdRng,
    }

    impl Fixture {
        /// Alice founds the room; the others enter as spectators.
        fn new(names: &[&str]) -> Self {
            let token = |n: &str| SessionToken::new(format!("token-{n}"));
            let mut room = Room::new("R", "", User::founder(names[0], token(names[0])));
            for &name in &names[1..] {
                room.add_member(User::newcomer(name, token(name))).unwrap();
            }
            Self {
                room,
                deck: TopicDeck::parse("cat,dog").unwrap(),
                rng: StdRng::seed_from_u64(42),
            }
        }

        fn send(&mut self, caller: &str, command: &str, meta: &str) -> GameResponse {
            process(
                &mut self.room,
                &self.deck,
                &mut self.rng,
                caller,
                &GameRequest::new(command, meta),
            )
            .expect("caller is a member")
            .response
        }

        fn participation(&self, name: &str) -> Participation {
            self.room.member(name).unwrap().participation
        }
    }

    #[test]
    fn test_command_parse_is_case_sensitive() {
        assert_eq!(Command::parse("start"), Some(Command::Start));
        assert_eq!(Command::parse("Start"), None);
        assert_eq!(Command::parse(""), None);
        for name in ["update", "start", "end", "join", "watch", "vote", "judge", "extend", "exit"] {
            assert_eq!(Command::parse(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_process_non_member_is_not_in_room() {
        let mut f = Fixture::new(&["Alice"]);
        let result = process(
            &mut f.room,
            &f.deck,
            &mut f.rng,
            "Mallory",
            &GameRequest::new("update", ""),
        );
        assert!(matches!(result, Err(RoomError::NotInRoom { .. })));
    }

    #[test]
    fn test_update_returns_snapshot_without_change() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        let resp = f.send("Bob", "update", "");

        assert_eq!(resp.command, "update");
        assert_eq!(resp.outcome, Outcome::Applied);
        let snapshot = resp.snapshot().unwrap();
        assert_eq!(snapshot.user_state.username, "Bob");
        assert_eq!(snapshot.members.len(), 2);
        assert_eq!(snapshot.room_state.state, RoundState::Standby);
    }

    #[test]
    fn test_unknown_command_is_unrecognized_with_empty_meta() {
        let mut f = Fixture::new(&["Alice"]);
        let resp = f.send("Alice", "dance", "");
        assert_eq!(resp.command, "dance");
        assert_eq!(resp.outcome, Outcome::Unrecognized);
        assert_eq!(resp.meta, ResponseMeta::Empty {});
    }

    #[test]
    fn test_response_echoes_command_name() {
        let mut f = Fixture::new(&["Alice"]);
        for name in ["update", "start", "end", "join", "watch", "vote", "judge", "extend"] {
            assert_eq!(f.send("Alice", name, "").command, name);
        }
    }

    #[test]
    fn test_start_begins_round() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        let resp = f.send("Bob", "start", "");

        assert_eq!(resp.outcome, Outcome::Applied);
        let snapshot = resp.snapshot().unwrap();
        assert_eq!(snapshot.room_state.state, RoundState::Battle);
        assert!(
            (snapshot.room_state.a == "cat" && snapshot.room_state.b == "dog")
                || (snapshot.room_state.a == "dog" && snapshot.room_state.b == "cat")
        );
        assert_eq!(snapshot.member("Alice").unwrap().state, Participation::Battle);
        assert_eq!(snapshot.member("Alice").unwrap().team, 1, "only player is the ghost");
        assert_eq!(snapshot.member("Bob").unwrap().state, Participation::Watch);
    }

    #[test]
    fn test_start_during_battle_is_ignored() {
        let mut f = Fixture::new(&["Alice"]);
        f.send("Alice", "start", "");
        let before = f.room.topics().0.to_owned();

        let resp = f.send("Alice", "start", "");

        assert_eq!(resp.outcome, Outcome::Ignored);
        assert_eq!(f.room.topics().0, before);
    }

    #[test]
    fn test_end_in_standby_is_ignored() {
        let mut f = Fixture::new(&["Alice"]);
        let resp = f.send("Alice", "end", "");
        assert_eq!(resp.outcome, Outcome::Ignored);
        assert_eq!(resp.snapshot().unwrap().room_state.state, RoundState::Standby);
    }

    #[test]
    fn test_join_in_standby_applies() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        let resp = f.send("Bob", "join", "");
        assert_eq!(resp.outcome, Outcome::Applied);
        assert_eq!(resp.snapshot().unwrap().user_state.state, Participation::Join);
    }

    #[test]
    fn test_join_during_battle_waits_for_next_round() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Alice", "start", "");
        let resp = f.send("Bob", "join", "");
        assert_eq!(resp.outcome, Outcome::Applied);
        assert_eq!(f.participation("Bob"), Participation::Join);
        assert_eq!(f.room.round(), RoundState::Battle);
    }

    #[test]
    fn test_watch_during_battle_leaves_round() {
        let mut f = Fixture::new(&["Alice"]);
        f.send("Alice", "start", "");
        let resp = f.send("Alice", "watch", "");
        assert_eq!(resp.outcome, Outcome::Applied);
        assert_eq!(f.participation("Alice"), Participation::Watch);
        assert_eq!(f.send("Alice", "judge", "").outcome, Outcome::Ignored);
    }

    #[test]
    fn test_watch_in_standby_applies() {
        let mut f = Fixture::new(&["Alice"]);
        f.send("Alice", "watch", "");
        assert_eq!(f.participation("Alice"), Participation::Watch);
    }

    #[test]
    fn test_vote_by_player_for_member_applies() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Bob", "join", "");
        f.send("Alice", "start", "");

        let resp = f.send("Alice", "vote", "Bob");

        assert_eq!(resp.command, "vote");
        assert_eq!(resp.outcome, Outcome::Applied);
        assert_eq!(resp.snapshot().unwrap().user_state.vote, "Bob");
    }

    #[test]
    fn test_vote_for_self_is_ignored() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Alice", "start", "");
        let resp = f.send("Alice", "vote", "Alice");
        assert_eq!(resp.outcome, Outcome::Ignored);
        assert!(f.room.member("Alice").unwrap().vote.is_empty());
    }

    #[test]
    fn test_vote_for_unknown_member_is_ignored() {
        let mut f = Fixture::new(&["Alice"]);
        f.send("Alice", "start", "");
        let resp = f.send("Alice", "vote", "Ghost");
        assert_eq!(resp.outcome, Outcome::Ignored);
    }

    #[test]
    fn test_vote_by_spectator_is_ignored() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Alice", "start", "");
        let resp = f.send("Bob", "vote", "Alice");
        assert_eq!(resp.outcome, Outcome::Ignored);
        assert!(f.room.member("Bob").unwrap().vote.is_empty());
    }

    #[test]
    fn test_vote_for_spectator_is_allowed() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Alice", "start", "");
        let resp = f.send("Alice", "vote", "Bob");
        assert_eq!(resp.outcome, Outcome::Applied);
    }

    #[test]
    fn test_judge_by_player_is_idempotent() {
        let mut f = Fixture::new(&["Alice"]);
        f.send("Alice", "start", "");
        assert_eq!(f.send("Alice", "judge", "").outcome, Outcome::Applied);
        assert_eq!(f.send("Alice", "judge", "").outcome, Outcome::Applied);
        assert!(f.room.member("Alice").unwrap().judge);
    }

    #[test]
    fn test_judge_by_spectator_is_ignored() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Alice", "start", "");
        assert_eq!(f.send("Bob", "judge", "").outcome, Outcome::Ignored);
        assert!(!f.room.member("Bob").unwrap().judge);
    }

    #[test]
    fn test_extend_never_changes_state() {
        let mut f = Fixture::new(&["Alice"]);
        let resp = f.send("Alice", "extend", "");
        assert_eq!(resp.outcome, Outcome::Ignored);
        assert_eq!(resp.snapshot().unwrap().room_state.state, RoundState::Standby);
    }

    #[test]
    fn test_exit_removes_member_and_reports_name() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        let processed = process(
            &mut f.room,
            &f.deck,
            &mut f.rng,
            "Bob",
            &GameRequest::new("exit", ""),
        )
        .unwrap();

        assert_eq!(
            processed.response.meta,
            ResponseMeta::Exit { exit_user: "Bob".into() }
        );
        assert_eq!(processed.departed.unwrap().name, "Bob");
        assert!(!f.room.contains("Bob"));
    }

    #[test]
    fn test_exit_during_battle_leaves_dangling_votes() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Bob", "join", "");
        f.send("Alice", "start", "");
        f.send("Alice", "vote", "Bob");

        f.send("Bob", "exit", "");

        assert_eq!(f.room.member("Alice").unwrap().vote, "Bob");
        assert_eq!(f.room.round(), RoundState::Battle);
    }

    #[test]
    fn test_full_round_then_end_resets() {
        let mut f = Fixture::new(&["Alice", "Bob"]);
        f.send("Bob", "join", "");
        f.send("Alice", "start", "");
        f.send("Alice", "vote", "Bob");
        f.send("Bob", "judge", "");

        let resp = f.send("Alice", "end", "");

        assert_eq!(resp.outcome, Outcome::Applied);
        let snapshot = resp.snapshot().unwrap();
        assert_eq!(snapshot.room_state.state, RoundState::Standby);
        assert!(snapshot.room_state.a.is_empty() && snapshot.room_state.b.is_empty());
        for member in &snapshot.members {
            assert!(member.vote.is_empty());
            assert!(!member.judge);
            assert_eq!(member.state, Participation::Join);
        }
    }
}
