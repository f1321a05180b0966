//! Rooms and rounds for Ghosthunt.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, its round state, and a lazily spawned broadcast fan-out.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, admits members, hands out handles
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the member table and round state machine (plain data)
//! - [`process`]: applies one in-round command to a [`Room`]
//! - [`TopicDeck`]: the topic pairs rounds draw from
//!
//! ```text
//! transport ──→ RoomRegistry ──→ RoomHandle ──→ RoomActor(Room) ──→ Fanout
//! ```

mod config;
mod error;
mod fanout;
mod game;
mod manager;
mod processor;
mod room;
mod topic;
mod user;

pub use config::RoomConfig;
pub use error::{RoomError, TopicError};
pub use fanout::{Frame, MemberSender};
pub use game::Room;
pub use manager::RoomRegistry;
pub use processor::{Command, Processed, process};
pub use room::{Delivery, Dispatched, RoomHandle, RoomInfo};
pub use topic::{TopicDeck, TopicPair};
pub use user::{Team, User};
