//! Unified error type for the Ghosthunt server.

use ghosthunt_protocol::ProtocolError;
use ghosthunt_room::{RoomError, TopicError};
use ghosthunt_session::SessionError;
use ghosthunt_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GhostError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A credential could not be resolved to a session.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, name taken, not a member).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The topic file could not be loaded.
    #[error(transparent)]
    Topic(#[from] TopicError),

    /// Binding or serving the HTTP listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let ghost_err: GhostError = err.into();
        assert!(matches!(ghost_err, GhostError::Transport(_)));
        assert!(ghost_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let ghost_err: GhostError = err.into();
        assert!(matches!(ghost_err, GhostError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let ghost_err: GhostError = SessionError::InvalidToken.into();
        assert!(matches!(ghost_err, GhostError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let ghost_err: GhostError = RoomError::NotFound("R".into()).into();
        assert!(matches!(ghost_err, GhostError::Room(_)));
        assert!(ghost_err.to_string().contains("R"));
    }

    #[test]
    fn test_from_topic_error() {
        let err = TopicError::Malformed { line: 3, reason: "x" };
        let ghost_err: GhostError = err.into();
        assert!(ghost_err.to_string().contains("line 3"));
    }
}
