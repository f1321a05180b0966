//! Per-room broadcast fan-out.
//!
//! The room actor never writes to a socket. After a broadcasted command it
//! hands the response to this task, which encodes it once and pushes the
//! same frame onto every subscriber's outbound queue. Each connection's
//! writer task drains its own queue, so one slow client never holds up the
//! room or its neighbours.
//!
//! ```text
//! RoomActor ──Publish──→ Fanout ──Frame──→ writer(Alice) ──→ socket
//!                           │  └──Frame──→ writer(Bob)   ──→ socket
//!                           └──Disconnect (dead queue)──→ RoomActor
//! ```
//!
//! The task is spawned lazily on the first attach and ends once the actor
//! drops it and the queue drains.

use std::collections::HashMap;
use std::sync::Arc;

use ghosthunt_protocol::{Codec, GameResponse, JsonCodec};
use ghosthunt_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::room::RoomCommand;

/// One encoded push frame, shared by every recipient.
pub type Frame = Arc<str>;

/// The outbound queue of one push connection.
pub type MemberSender = mpsc::UnboundedSender<Frame>;

enum FanoutCommand {
    Subscribe {
        username: String,
        connection: ConnectionId,
        sender: MemberSender,
    },
    Unsubscribe {
        username: String,
    },
    Publish(GameResponse),
}

/// Owning handle to a room's fan-out task.
pub(crate) struct Fanout {
    tx: mpsc::UnboundedSender<FanoutCommand>,
}

impl Fanout {
    /// Starts the fan-out task for `room`.
    ///
    /// `events` is a weak handle back to the room actor, used to report
    /// subscribers whose queue has closed. It is weak so the fan-out never
    /// keeps a finished room alive.
    pub(crate) fn spawn(
        room: String,
        events: mpsc::WeakSender<RoomCommand>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(room, rx, events));
        Self { tx }
    }

    /// Routes future frames for `username` to `sender`, replacing any
    /// previous subscription of that member.
    pub(crate) fn subscribe(
        &self,
        username: &str,
        connection: ConnectionId,
        sender: MemberSender,
    ) {
        let _ = self.tx.send(FanoutCommand::Subscribe {
            username: username.to_owned(),
            connection,
            sender,
        });
    }

    pub(crate) fn unsubscribe(&self, username: &str) {
        let _ = self.tx.send(FanoutCommand::Unsubscribe {
            username: username.to_owned(),
        });
    }

    /// Queues `response` for every subscriber.
    pub(crate) fn publish(&self, response: GameResponse) {
        let _ = self.tx.send(FanoutCommand::Publish(response));
    }
}

async fn run(
    room: String,
    mut rx: mpsc::UnboundedReceiver<FanoutCommand>,
    events: mpsc::WeakSender<RoomCommand>,
) {
    tracing::debug!(%room, "fan-out started");
    let codec = JsonCodec;
    let mut subscribers: HashMap<String, (ConnectionId, MemberSender)> =
        HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            FanoutCommand::Subscribe {
                username,
                connection,
                sender,
            } => {
                subscribers.insert(username, (connection, sender));
            }
            FanoutCommand::Unsubscribe { username } => {
                subscribers.remove(&username);
            }
            FanoutCommand::Publish(response) => {
                let frame: Frame = match codec.encode_text(&response) {
                    Ok(text) => text.into(),
                    Err(e) => {
                        tracing::error!(%room, error = %e, "failed to encode broadcast");
                        continue;
                    }
                };

                let mut dead = Vec::new();
                for (username, (connection, sender)) in &subscribers {
                    if sender.send(Arc::clone(&frame)).is_err() {
                        dead.push((username.clone(), *connection));
                    }
                }

                for (username, connection) in dead {
                    subscribers.remove(&username);
                    tracing::debug!(%room, user = %username, %connection, "subscriber gone");
                    let Some(events) = events.upgrade() else {
                        continue;
                    };
                    let _ = events
                        .send(RoomCommand::Disconnect {
                            username,
                            connection,
                        })
                        .await;
                }
            }
        }
    }

    tracing::debug!(%room, "fan-out stopped");
}
