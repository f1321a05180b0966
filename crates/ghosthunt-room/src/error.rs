//! Error types for the room layer.

/// Errors that can occur during room and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this name.
    #[error("room {0} not found")]
    NotFound(String),

    /// A live room already has this name.
    #[error("room {0} already exists")]
    AlreadyExists(String),

    /// The display name is already a member of the room.
    #[error("username {user} is already used in room {room}")]
    NameTaken { room: String, user: String },

    /// The caller is not (or no longer) a member, or presented a token
    /// that does not belong to that member.
    #[error("user {user} is not in room {room}")]
    NotInRoom { room: String, user: String },

    /// The room actor has stopped; its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}

/// Errors raised while loading the topic list.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    /// The topic file could not be read.
    #[error("failed to read topics: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid `topicA,topicB` pair.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: &'static str },
}
