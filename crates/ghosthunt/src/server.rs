//! `GhostServer` builder and server loop.
//!
//! This is the entry point for running a Ghosthunt server. It ties
//! together all the layers: transport → protocol → session → room, and
//! runs two listeners side by side:
//!
//! ```text
//! http_addr ──axum──→ /api, /game, /room/{name}/membership   (request/response)
//! ws_addr ──tungstenite──→ handle_connection                  (push)
//! ```

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ghosthunt_protocol::JsonCodec;
use ghosthunt_room::{RoomConfig, RoomHandle, RoomRegistry, TopicDeck};
use ghosthunt_session::{Session, SessionConfig, SessionError, cookie};
use ghosthunt_transport::{PendingConnection, Transport, WebSocketTransport};
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{GhostError, ServerConfig};

/// Shared server state passed to every HTTP request and push handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry carries its own locks.
pub(crate) struct ServerState {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) session_config: SessionConfig,
    pub(crate) write_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

impl ServerState {
    /// Resolves a raw `Cookie` header into the session it carries and a
    /// handle to that session's room.
    ///
    /// A session whose room has already gone is treated like an unknown
    /// token.
    pub(crate) async fn resolve(
        &self,
        cookie_header: Option<&str>,
    ) -> Result<(Session, RoomHandle), GhostError> {
        let token = cookie::token_from_header(cookie_header)?;
        let session = self
            .registry
            .sessions()
            .lock()
            .await
            .lookup(&token)?
            .clone();
        let room = self
            .registry
            .get_room(&session.room)
            .await
            .map_err(|_| SessionError::InvalidToken)?;
        Ok((session, room))
    }
}

/// Builder for configuring and starting a Ghosthunt server.
///
/// # Example
///
/// ```rust,no_run
/// use ghosthunt::prelude::*;
///
/// # async fn run() -> Result<(), GhostError> {
/// let server = GhostServer::builder()
///     .http_addr("0.0.0.0:8080")
///     .ws_addr("0.0.0.0:8081")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GhostServerBuilder {
    config: ServerConfig,
    topics: Option<TopicDeck>,
}

impl GhostServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            topics: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address of the HTTP listener.
    pub fn http_addr(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Sets the address of the WebSocket listener.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.config.ws_addr = addr.to_string();
        self
    }

    /// Uses `deck` instead of loading `topics_path` at build time.
    pub fn topics(mut self, deck: TopicDeck) -> Self {
        self.topics = Some(deck);
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets the per-frame push write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Sets how long a push peer may take over its WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Loads the topics and binds both listeners.
    ///
    /// # Errors
    /// Fails if the topic file cannot be loaded or either address cannot
    /// be bound.
    pub async fn build(self) -> Result<GhostServer, GhostError> {
        let Self { config, topics } = self;
        let deck = match topics {
            Some(deck) => deck,
            None => TopicDeck::load(&config.topics_path)?,
        };
        if deck.is_empty() {
            tracing::warn!("topic list is empty, rounds cannot start");
        }

        let http = TcpListener::bind(&config.http_addr).await?;
        let transport = WebSocketTransport::bind(&config.ws_addr).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(deck, config.room),
            codec: JsonCodec,
            session_config: config.session,
            write_timeout: config.write_timeout,
            handshake_timeout: config.handshake_timeout,
        });

        Ok(GhostServer {
            http,
            transport,
            state,
        })
    }
}

impl Default for GhostServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Ghosthunt server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct GhostServer {
    http: TcpListener,
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl GhostServer {
    /// Creates a new builder.
    pub fn builder() -> GhostServerBuilder {
        GhostServerBuilder::new()
    }

    /// Returns the address the HTTP listener is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Returns the address the WebSocket listener is bound to.
    pub fn ws_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the HTTP routes bound to this server's state, for serving
    /// elsewhere or driving in-process.
    pub fn router(&self) -> axum::Router {
        crate::http::router(Arc::clone(&self.state))
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), GhostError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then shuts every room down.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), GhostError> {
        let Self {
            http,
            transport,
            state,
        } = self;
        tracing::info!(
            http = ?http.local_addr().ok(),
            ws = ?transport.local_addr().ok(),
            "Ghosthunt server running"
        );

        let router = crate::http::router(Arc::clone(&state));
        let serve_http = axum::serve(http, router).into_future();

        tokio::select! {
            result = serve_http => result?,
            () = accept_loop(transport, Arc::clone(&state)) => {}
            () = shutdown => {
                tracing::info!("shutdown requested");
            }
        }

        state.registry.shutdown_all().await;
        Ok(())
    }
}

/// Accepts push connections and spawns a handler task for each.
///
/// The WebSocket upgrade runs inside the spawned task, so a peer that
/// stalls mid-handshake only costs its own task until the timeout.
async fn accept_loop(mut transport: WebSocketTransport, state: Arc<ServerState>) {
    loop {
        match transport.accept().await {
            Ok(pending) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let peer = pending.peer_addr();
                    let conn = match tokio::time::timeout(
                        state.handshake_timeout,
                        pending.upgrade(),
                    )
                    .await
                    {
                        Ok(Ok(conn)) => conn,
                        Ok(Err(e)) => {
                            tracing::debug!(%peer, error = %e, "handshake failed");
                            return;
                        }
                        Err(_) => {
                            tracing::debug!(%peer, "handshake timed out");
                            return;
                        }
                    };
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(
                            error = %e,
                            "connection ended with error"
                        );
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}
