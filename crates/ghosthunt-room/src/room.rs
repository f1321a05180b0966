//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Because only the actor touches the room,
//! commands are applied one at a time in arrival order and no lock is ever
//! held around game state.
//!
//! When the last member leaves (or on shutdown) the actor stops taking
//! commands, removes itself from the registry and revokes the room's
//! sessions.

use std::sync::atomic::{AtomicU64, Ordering};

use ghosthunt_protocol::{GameRequest, GameResponse, MemberStatus, RoomStatus};
use ghosthunt_session::Session;
use ghosthunt_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::fanout::{Fanout, MemberSender};
use crate::manager::Directory;
use crate::processor::{self, Processed};
use crate::{Room, RoomConfig, RoomError, TopicDeck, User};

/// Counter for telling apart successive rooms that reuse a name.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one room actor. A name can be reused once its room is
/// gone; the instance never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Instance(u64);

impl Instance {
    fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a command's response goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Only back to the caller (request/response path).
    Reply,
    /// Back to the caller and, through the fan-out, to every attached
    /// connection (push path).
    Broadcast,
}

/// Result of a dispatched command.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub response: GameResponse,
    /// The caller left the room with this command.
    pub exited: bool,
}

/// A snapshot of a room that is not tied to any viewer.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room: RoomStatus,
    /// Every member, ordered by name.
    pub members: Vec<MemberStatus>,
    /// How many members have a push connection attached.
    pub connected: usize,
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the answer on it.
pub(crate) enum RoomCommand {
    /// Add a member.
    Enter {
        user: User,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Route broadcasts for a member to a push connection.
    Attach {
        session: Session,
        connection: ConnectionId,
        sender: MemberSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Run one in-round command.
    Dispatch {
        session: Session,
        request: GameRequest,
        delivery: Delivery,
        reply: oneshot::Sender<Result<Dispatched, RoomError>>,
    },

    /// A push connection went away. Removes the member only if that
    /// connection is still the one attached.
    Disconnect {
        username: String,
        connection: ConnectionId,
    },

    /// Look up the member `session` admits.
    Member {
        session: Session,
        reply: oneshot::Sender<Result<MemberStatus, RoomError>>,
    },

    /// Request the current room state.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the room's name.
#[derive(Clone)]
pub struct RoomHandle {
    name: String,
    instance: Instance,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instance(&self) -> Instance {
        self.instance
    }

    /// Returns `true` once the actor has stopped taking commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.name.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.name.clone()))
    }

    /// A handle whose commands are queued but never answered while the
    /// returned inbox is alive. Dropping the inbox stops the "actor".
    #[cfg(test)]
    pub(crate) fn unanswered(
        name: &str,
    ) -> (Self, mpsc::Receiver<RoomCommand>) {
        let (sender, inbox) = mpsc::channel(8);
        let handle = Self {
            name: name.to_owned(),
            instance: Instance::next(),
            sender,
        };
        (handle, inbox)
    }

    /// Adds `user` to the room.
    pub async fn enter(&self, user: User) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Enter { user, reply })
            .await?
    }

    /// Attaches a push connection for the member `session` admits.
    ///
    /// From now on every broadcast of this room is queued on `sender`.
    pub async fn attach(
        &self,
        session: &Session,
        connection: ConnectionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        let session = session.clone();
        self.request(|reply| RoomCommand::Attach {
            session,
            connection,
            sender,
            reply,
        })
        .await?
    }

    /// Runs `request` and returns the response to the caller only.
    pub async fn dispatch(
        &self,
        session: &Session,
        request: GameRequest,
    ) -> Result<Dispatched, RoomError> {
        self.run_command(session, request, Delivery::Reply).await
    }

    /// Runs `request` and also fans the response out to every attached
    /// connection.
    pub async fn broadcast(
        &self,
        session: &Session,
        request: GameRequest,
    ) -> Result<Dispatched, RoomError> {
        self.run_command(session, request, Delivery::Broadcast)
            .await
    }

    async fn run_command(
        &self,
        session: &Session,
        request: GameRequest,
        delivery: Delivery,
    ) -> Result<Dispatched, RoomError> {
        let session = session.clone();
        self.request(|reply| RoomCommand::Dispatch {
            session,
            request,
            delivery,
            reply,
        })
        .await?
    }

    /// Reports that a push connection closed (fire-and-forget).
    pub async fn disconnect(&self, username: &str, connection: ConnectionId) {
        let _ = self
            .sender
            .send(RoomCommand::Disconnect {
                username: username.to_owned(),
                connection,
            })
            .await;
    }

    /// Returns the public state of the member `session` admits.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if that member is gone or the token no
    /// longer matches.
    pub async fn member(&self, session: &Session) -> Result<MemberStatus, RoomError> {
        let session = session.clone();
        self.request(|reply| RoomCommand::Member { session, reply })
            .await?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.name.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    instance: Instance,
    room: Room,
    deck: TopicDeck,
    rng: StdRng,
    /// Spawned on the first attach.
    fanout: Option<Fanout>,
    /// Weak handle to our own channel, lent to the fan-out.
    events: mpsc::WeakSender<RoomCommand>,
    receiver: mpsc::Receiver<RoomCommand>,
    directory: Option<Directory>,
}

impl RoomActor {
    /// Runs the actor loop until the room empties or is shut down.
    async fn run(mut self) {
        tracing::info!(room = %self.room.name(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Enter { user, reply } => {
                    let result = self.handle_enter(user);
                    let _ = reply.send(result);
                }
                RoomCommand::Attach {
                    session,
                    connection,
                    sender,
                    reply,
                } => {
                    let result = self.handle_attach(&session, connection, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Dispatch {
                    session,
                    request,
                    delivery,
                    reply,
                } => {
                    let result = self.handle_dispatch(&session, &request, delivery);
                    let _ = reply.send(result);
                }
                RoomCommand::Disconnect {
                    username,
                    connection,
                } => {
                    self.handle_disconnect(&username, connection);
                }
                RoomCommand::Member { session, reply } => {
                    let result = self.authorize(&session).and_then(|()| {
                        self.room
                            .member(&session.username)
                            .map(User::status)
                            .ok_or_else(|| self.not_in_room(&session))
                    });
                    let _ = reply.send(result);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room = %self.room.name(), "room shutting down");
                    break;
                }
            }

            if self.room.is_empty() {
                tracing::info!(room = %self.room.name(), "last member left");
                break;
            }
        }

        let RoomActor {
            instance,
            room,
            fanout,
            receiver,
            directory,
            ..
        } = self;
        // Refuse queued and future commands before leaving the registry,
        // so nobody can enter a room that is already gone.
        drop(receiver);
        drop(fanout);
        if let Some(directory) = directory {
            directory.deregister(room.name(), instance).await;
        }

        tracing::info!(room = %room.name(), "room actor stopped");
    }

    /// Checks that `session` still names a member and carries that
    /// member's token.
    fn authorize(&self, session: &Session) -> Result<(), RoomError> {
        match self.room.member(&session.username) {
            Some(member) if member.id == session.token => Ok(()),
            _ => Err(self.not_in_room(session)),
        }
    }

    fn not_in_room(&self, session: &Session) -> RoomError {
        RoomError::NotInRoom {
            room: self.room.name().to_owned(),
            user: session.username.clone(),
        }
    }

    fn handle_enter(&mut self, user: User) -> Result<(), RoomError> {
        let name = user.name.clone();
        self.room.add_member(user)?;
        tracing::info!(
            room = %self.room.name(),
            user = %name,
            members = self.room.len(),
            "member entered"
        );
        Ok(())
    }

    fn handle_attach(
        &mut self,
        session: &Session,
        connection: ConnectionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        self.authorize(session)?;
        if let Some(member) = self.room.member_mut(&session.username) {
            member.connection = Some(connection);
        }

        let fanout = self.fanout.get_or_insert_with(|| {
            Fanout::spawn(self.room.name().to_owned(), self.events.clone())
        });
        fanout.subscribe(&session.username, connection, sender);

        tracing::debug!(
            room = %self.room.name(),
            user = %session.username,
            %connection,
            "connection attached"
        );
        Ok(())
    }

    fn handle_dispatch(
        &mut self,
        session: &Session,
        request: &GameRequest,
        delivery: Delivery,
    ) -> Result<Dispatched, RoomError> {
        self.authorize(session)?;
        let Processed { response, departed } = processor::process(
            &mut self.room,
            &self.deck,
            &mut self.rng,
            &session.username,
            request,
        )?;
        let exited = departed.is_some();

        if let Some(fanout) = &self.fanout {
            if exited {
                fanout.unsubscribe(&session.username);
            }
            if delivery == Delivery::Broadcast {
                fanout.publish(response.clone());
            }
        }

        Ok(Dispatched { response, exited })
    }

    fn handle_disconnect(&mut self, username: &str, connection: ConnectionId) {
        let attached = self
            .room
            .member(username)
            .is_some_and(|m| m.connection == Some(connection));
        if !attached {
            // A newer connection took over, or the member already left.
            return;
        }

        self.room.remove_member(username);
        if let Some(fanout) = &self.fanout {
            fanout.unsubscribe(username);
        }
        tracing::info!(
            room = %self.room.name(),
            user = username,
            %connection,
            remaining = self.room.len(),
            "member disconnected"
        );
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room: self.room.status(),
            members: self.room.member_statuses(),
            connected: self
                .room
                .members()
                .filter(|m| m.connection.is_some())
                .count(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `config.channel_size` controls backpressure: if the channel fills up,
/// senders wait (bounded channel).
pub(crate) fn spawn_room(
    name: &str,
    password: &str,
    founder: User,
    deck: TopicDeck,
    config: &RoomConfig,
    directory: Option<Directory>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let instance = Instance::next();
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let actor = RoomActor {
        instance,
        room: Room::new(name, password, founder),
        deck,
        rng,
        fanout: None,
        events: tx.downgrade(),
        receiver: rx,
        directory,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        name: name.to_owned(),
        instance,
        sender: tx,
    }
}
