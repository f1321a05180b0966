//! # Ghosthunt
//!
//! Server for "who is the ghost", a social deduction party game: every
//! player in a round gets a secret word, except one (the ghost) whose word
//! is the other half of a near-synonym pair. Players talk, vote, and try
//! to find the ghost.
//!
//! The server keeps every room in memory and offers two ways in:
//!
//! - **HTTP**: `POST /api` creates or enters a room and sets the session
//!   cookie; `POST /game` runs one in-round command and answers the
//!   caller only.
//! - **WebSocket**: a push connection opened with the session cookie;
//!   each inbound frame is a command and every answer is broadcast to the
//!   whole room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ghosthunt::prelude::*;
//!
//! # async fn run() -> Result<(), GhostError> {
//! let server = GhostServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod http;
mod server;

pub use config::ServerConfig;
pub use error::GhostError;
pub use http::MembershipReply;
pub use server::{GhostServer, GhostServerBuilder};

/// Everything needed to start a server and talk to it.
pub mod prelude {
    pub use crate::{
        GhostError, GhostServer, GhostServerBuilder, MembershipReply,
        ServerConfig,
    };
    pub use ghosthunt_protocol::{
        Codec, ErrorReply, GameRequest, GameResponse, JsonCodec, LobbyAction,
        LobbyReply, MemberStatus, Outcome, Participation, ResponseMeta,
        RoomRequest, RoomStatus, RoundState, Snapshot,
    };
    pub use ghosthunt_room::{RoomConfig, TopicDeck, TopicPair};
    pub use ghosthunt_session::SessionConfig;
    pub use ghosthunt_session::cookie::COOKIE_NAME;
}
