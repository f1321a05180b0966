//! Wire protocol for Ghosthunt.
//!
//! - **Types** ([`RoomRequest`], [`GameRequest`], [`GameResponse`],
//!   [`Snapshot`], labels): the shapes on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how push frames are
//!   turned into bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (GameRequest) → Room (command processor)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ErrorReply, GameRequest, GameResponse, LobbyAction, LobbyReply,
    MemberStatus, Outcome, Participation, ResponseMeta, RoomRequest,
    RoomStatus, RoundState, SessionToken, Snapshot,
};
