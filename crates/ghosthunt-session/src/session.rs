//! Session types.

use ghosthunt_protocol::SessionToken;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for how credentials are handed to clients.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `Max-Age` of the session cookie, in seconds.
    ///
    /// This is only a hint to the browser. The store never expires
    /// sessions on its own; they end on `exit` or when the room goes away.
    pub cookie_max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_max_age_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One token's binding to a member of a room.
///
/// This is a lookup aid: the room owns the member, the session just
/// remembers where to find them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The token the client presents.
    pub token: SessionToken,
    /// Display name of the member inside the room.
    pub username: String,
    /// Name of the room the member belongs to.
    pub room: String,
}
