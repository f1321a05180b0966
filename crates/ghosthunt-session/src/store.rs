//! The session store: token → (user, room).
//!
//! # Concurrency note
//!
//! `SessionStore` is a plain `HashMap` wrapper and is not thread-safe by
//! itself. The server keeps exactly one behind a `tokio::sync::Mutex`
//! shared by the HTTP routes, the push handlers, and the room registry.

use std::collections::HashMap;

use ghosthunt_protocol::SessionToken;
use rand::Rng;

use crate::{Session, SessionError};

/// Number of hex characters in a generated token (128 bits).
pub(crate) const TOKEN_LEN: usize = 32;

/// Maps session tokens to the member they admit.
///
/// ## Lifecycle
///
/// ```text
/// create/enter room ──→ create() ──→ lookup() ... ──→ revoke()        (exit)
///                                               └──→ revoke_room()   (room gone)
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionToken, Session>,
}

impl SessionStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token bound to `username` in `room`.
    ///
    /// Tokens are random, so creating twice for the same member yields
    /// two independent sessions.
    pub fn create(&mut self, username: &str, room: &str) -> SessionToken {
        let token = generate_token();
        let session = Session {
            token: token.clone(),
            username: username.to_owned(),
            room: room.to_owned(),
        };
        self.sessions.insert(token.clone(), session);

        tracing::debug!(%token, user = username, room, "session created");
        token
    }

    /// Resolves a token.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidToken`] if nothing is bound to it.
    pub fn lookup(&self, token: &SessionToken) -> Result<&Session, SessionError> {
        self.sessions.get(token).ok_or(SessionError::InvalidToken)
    }

    /// Removes one session. Returns it if it existed.
    ///
    /// Revoking never touches the room: rooms live as long as they have
    /// members, regardless of how many sessions point at them.
    pub fn revoke(&mut self, token: &SessionToken) -> Option<Session> {
        let removed = self.sessions.remove(token);
        if let Some(session) = &removed {
            tracing::debug!(
                %token,
                user = %session.username,
                room = %session.room,
                "session revoked"
            );
        }
        removed
    }

    /// Removes every session that points at `room`. Returns how many were
    /// dropped.
    pub fn revoke_room(&mut self, room: &str) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.room != room);
        let dropped = before - self.sessions.len();
        if dropped > 0 {
            tracing::debug!(room, dropped, "room sessions revoked");
        }
        dropped
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character lowercase hex token (128 bits).
pub fn generate_token() -> SessionToken {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_LEN / 2] = rng.random();
    SessionToken::new(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>(),
    )
}

// =========================================================================
// Tests
// =========================================================================
