//! Per-connection push handler: auth, attach, and command routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Resolve the session from the upgrade request's cookie
//!   2. Attach the connection to the member in its room
//!   3. Spawn a writer task draining the member's outbound queue
//!   4. Loop: receive commands → run them as broadcasts, until the peer
//!      leaves or the writer gives up on it

use std::sync::Arc;
use std::time::Duration;

use ghosthunt_protocol::{Codec, ErrorReply, GameRequest};
use ghosthunt_room::{Frame, RoomHandle};
use ghosthunt_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GhostError;
use crate::server::ServerState;

/// Drop guard that reports the connection gone when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the send.
struct DisconnectGuard {
    room: RoomHandle,
    username: String,
    connection: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let room = self.room.clone();
        let username = std::mem::take(&mut self.username);
        let connection = self.connection;
        tokio::spawn(async move {
            room.disconnect(&username, connection).await;
        });
    }
}

/// Handles a single push connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), GhostError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(conn = %conn_id, "handling new connection");

    // --- Step 1: Resolve the session ---
    let (session, room) = match state.resolve(conn.cookie_header()).await {
        Ok(found) => found,
        Err(e) => {
            reject(&conn, &state).await;
            return Err(e);
        }
    };

    // --- Step 2: Attach ---
    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = room.attach(&session, conn_id, tx).await {
        reject(&conn, &state).await;
        return Err(e.into());
    }
    let _guard = DisconnectGuard {
        room: room.clone(),
        username: session.username.clone(),
        connection: conn_id,
    };
    tracing::info!(
        conn = %conn_id,
        room = %session.room,
        user = %session.username,
        "push connection attached"
    );

    // --- Step 3: Writer ---
    let mut writer = tokio::spawn(write_frames(
        Arc::clone(&conn),
        rx,
        state.write_timeout,
    ));

    // --- Step 4: Command loop ---
    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            _ = &mut writer => {
                tracing::info!(
                    user = %session.username,
                    "push writer stopped, dropping connection"
                );
                break;
            }
        };
        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(
                    user = %session.username,
                    "connection closed cleanly"
                );
                break;
            }
            Err(e) => {
                tracing::debug!(
                    user = %session.username,
                    error = %e,
                    "recv error"
                );
                break;
            }
        };

        let request: GameRequest = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(
                    user = %session.username,
                    error = %e,
                    "failed to decode command"
                );
                continue;
            }
        };

        let dispatched = match room.broadcast(&session, request).await {
            Ok(dispatched) => dispatched,
            Err(e) => {
                tracing::debug!(
                    user = %session.username,
                    error = %e,
                    "command rejected, dropping connection"
                );
                break;
            }
        };

        if dispatched.exited {
            // The room has already dropped our queue; let the writer
            // flush what was queued before answering the exit itself.
            let _ = (&mut writer).await;
            state
                .registry
                .sessions()
                .lock()
                .await
                .revoke(&session.token);

            let text = state.codec.encode_text(&dispatched.response)?;
            let _ = tokio::time::timeout(
                state.write_timeout,
                conn.send_text(&text),
            )
            .await;
            let _ = tokio::time::timeout(state.write_timeout, conn.close()).await;
            tracing::info!(
                room = %session.room,
                user = %session.username,
                "member exited"
            );
            return Ok(());
        }
    }

    // _guard drops here → the room removes the member.
    Ok(())
}

/// Drains a member's outbound queue onto the socket.
///
/// Ends when the room drops the queue or when a write fails or stalls.
/// Returning drops the queue, so the room's next push to this member
/// reports it gone, and the read loop stops waiting on the peer. The
/// close frame gets the same deadline as a data frame.
async fn write_frames(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    write_timeout: Duration,
) {
    while let Some(frame) = rx.recv().await {
        match tokio::time::timeout(write_timeout, conn.send_text(&frame)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(conn = %conn.id(), error = %e, "push write failed");
                let _ = tokio::time::timeout(write_timeout, conn.close()).await;
                return;
            }
            Err(_) => {
                tracing::warn!(conn = %conn.id(), "push write timed out");
                let _ = tokio::time::timeout(write_timeout, conn.close()).await;
                return;
            }
        }
    }
}

/// Sends the single "invalid user" frame and closes.
async fn reject(conn: &WebSocketConnection, state: &ServerState) {
    tracing::debug!(conn = %conn.id(), "rejecting push connection");
    if let Ok(text) = state.codec.encode_text(&ErrorReply::new("invalid user")) {
        let _ =
            tokio::time::timeout(state.write_timeout, conn.send_text(&text)).await;
    }
    let _ = tokio::time::timeout(state.write_timeout, conn.close()).await;
}
