//! Error types for the session layer.

/// Errors that can occur while resolving a session credential.
///
/// Every variant surfaces to clients the same way ("invalid user"); the
/// distinction only matters for logs.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request carried no session cookie at all.
    #[error("missing session credential")]
    MissingCredential,

    /// A session cookie was present but is not a well-formed token.
    #[error("malformed session credential")]
    MalformedCredential,

    /// The token is well-formed but no session is bound to it (never
    /// issued, revoked on exit, or dropped with its room).
    #[error("unknown session token")]
    InvalidToken,
}
