//! Wire types for Ghosthunt.
//!
//! Everything in this module is serialized either into an HTTP body
//! (request/response path) or into a push frame. Both transports share
//! the same [`GameResponse`] shape.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An opaque session token.
///
/// Issued when a user creates or enters a room, carried back by the client
/// in the session cookie, and resolved by the session store into the
/// (user, room) pair it authorizes.
///
/// `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token string. No validation happens here; the session
    /// layer decides what a well-formed token looks like.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Only a prefix is shown so tokens never end up whole in logs.
impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{prefix}…")
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Round state of a room.
///
/// ```text
/// Standby ──(start)──→ Battle ──(end)──→ Standby
/// ```
///
/// `Trial` is part of the wire vocabulary but no command ever enters it.
/// `Unrecognized` only exists so clients can decode labels they don't
/// know yet; the server never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    #[default]
    Standby,
    Battle,
    Trial,
    #[serde(other)]
    Unrecognized,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Standby => "standby",
            Self::Battle => "battle",
            Self::Trial => "trial",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// How a member takes part in the room.
///
/// - `Join`: eligible for the next round
/// - `Watch`: spectating, never drawn into a round
/// - `Battle`: playing the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participation {
    Join,
    Watch,
    Battle,
    #[serde(other)]
    Unrecognized,
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Join => "join",
            Self::Watch => "watch",
            Self::Battle => "battle",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// Whether a command changed anything.
///
/// Failed preconditions are not errors: the command still answers with a
/// snapshot, and this flag tells the client the state was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The command was carried out.
    Applied,
    /// The command was understood but had nothing to do.
    Ignored,
    /// The command name is unknown; `meta` is empty.
    Unrecognized,
}

// ---------------------------------------------------------------------------
// Lobby (create / enter)
// ---------------------------------------------------------------------------

/// The two lobby operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyAction {
    /// Register a new room with the caller as founding member.
    Create,
    /// Join an existing room as a spectator.
    Enter,
}

/// Body of a lobby request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRequest {
    pub command: LobbyAction,
    pub room_name: String,
    /// Stored with the room, never checked.
    #[serde(default)]
    pub room_password: String,
    pub username: String,
}

/// Successful lobby reply. The credential travels in a cookie alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyReply {
    pub roomname: String,
    pub message: String,
}

/// Failure body shared by every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub message: String,
}

impl ErrorReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// In-round commands
// ---------------------------------------------------------------------------

/// One in-round command.
///
/// `meta` is a free-form argument whose meaning depends on the command;
/// today only `vote` reads it (the suspected member's name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRequest {
    pub command: String,
    #[serde(default)]
    pub meta: String,
}

impl GameRequest {
    pub fn new(command: impl Into<String>, meta: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            meta: meta.into(),
        }
    }
}

/// The answer to a [`GameRequest`], identical on both transports.
///
/// ```json
/// { "command": "vote", "outcome": "applied", "meta": { ...snapshot... } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResponse {
    pub command: String,
    pub outcome: Outcome,
    pub meta: ResponseMeta,
}

impl GameResponse {
    /// Returns the snapshot carried by this response, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.meta {
            ResponseMeta::Snapshot(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// The command-specific part of a response.
///
/// `#[serde(untagged)]` means the JSON has no discriminator: a snapshot is
/// a plain object with `room_state`/`members`, an exit is
/// `{"exit_user": ...}` and the unrecognized case is `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseMeta {
    Snapshot(Snapshot),
    Exit { exit_user: String },
    Empty {},
}

/// Full observable state of a room, from one member's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The member who issued the command.
    pub user_state: MemberStatus,
    pub room_state: RoomStatus,
    /// Every member, ordered by name.
    pub members: Vec<MemberStatus>,
}

impl Snapshot {
    /// Looks up a member by name.
    pub fn member(&self, username: &str) -> Option<&MemberStatus> {
        self.members.iter().find(|m| m.username == username)
    }
}

/// Public state of a room. Topics are identical for every viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    pub roomname: String,
    pub state: RoundState,
    pub a: String,
    pub b: String,
}

/// Public state of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatus {
    pub username: String,
    pub vote: String,
    pub judge: bool,
    /// 0 for the majority, 1 for the ghost.
    pub team: u8,
    pub state: Participation,
}

// =========================================================================
// Tests
// =========================================================================
