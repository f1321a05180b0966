//! Push transport layer for Ghosthunt.
//!
//! Provides the [`Transport`] and [`Connection`] traits used by the push
//! path: a persistent, bidirectional stream where the client sends one
//! command per frame and the server fans room snapshots back out.
//!
//! The request/response path does not go through this crate; it lives on
//! the HTTP router in the `ghosthunt` crate.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
///
/// Rooms remember which connection a member is attached through, so a
/// late disconnect from an old socket cannot evict a member who has
/// already reconnected on a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting only takes the connection off the listener. The protocol
/// handshake runs later, in [`PendingConnection::upgrade`], so a peer that
/// never finishes it holds up nothing but its own task.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted connection that has not been upgraded yet.
    type Pending: PendingConnection<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// An accepted connection waiting for its handshake.
pub trait PendingConnection: Send + 'static {
    /// The connection type produced by the handshake.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake. Callers are expected to bound this with a
    /// timeout; the peer controls how long it takes.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> std::net::SocketAddr;
}

/// A single push connection.
///
/// Reads and writes are independent: one task may sit in [`recv`] while
/// another task writes with [`send_text`].
///
/// [`recv`]: Connection::recv
/// [`send_text`]: Connection::send_text
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a text frame to the remote peer.
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the raw `Cookie` header the client presented when the
    /// connection was opened, if any.
    fn cookie_header(&self) -> Option<&str>;
}
