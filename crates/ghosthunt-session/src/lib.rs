//! Session management for Ghosthunt.
//!
//! A session binds an opaque token to the (user, room) pair it
//! authorizes. This crate covers:
//!
//! 1. **Tokens**: generating unguessable identifiers ([`generate_token`])
//! 2. **Credentials**: reading and issuing the session cookie
//!    ([`cookie`] module)
//! 3. **Lookup**: resolving tokens to sessions ([`SessionStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← revokes sessions when a room is deregistered
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below) ← provides SessionToken
//! ```

pub mod cookie;
mod error;
mod session;
mod store;

pub use error::SessionError;
pub use session::{Session, SessionConfig};
pub use store::{SessionStore, generate_token};
