//! Room registry: creates, tracks, and routes members to rooms.
//!
//! # Locking
//!
//! The registry holds two maps, each behind its own `tokio::sync::Mutex`:
//! room name → [`RoomHandle`], and the shared [`SessionStore`]. Whenever
//! both are needed they are taken in that order (rooms, then sessions).
//! Room actors never take either lock while processing a command; they
//! only take them once, on the way out, to deregister. The registry in
//! turn never holds the room map while waiting on an actor: it clones the
//! handle out and lets go first.

use std::collections::HashMap;
use std::sync::Arc;

use ghosthunt_session::{Session, SessionStore};
use tokio::sync::Mutex;

use crate::room::{Instance, spawn_room};
use crate::{RoomConfig, RoomError, RoomHandle, TopicDeck, User};

type RoomMap = HashMap<String, RoomHandle>;

/// The shared tables a room actor needs to remove itself.
#[derive(Clone)]
pub(crate) struct Directory {
    rooms: Arc<Mutex<RoomMap>>,
    sessions: Arc<Mutex<SessionStore>>,
}

impl Directory {
    /// Removes the room `name` if it is still the instance that is
    /// leaving, and revokes every session that points at it.
    pub(crate) async fn deregister(&self, name: &str, instance: Instance) {
        let mut rooms = self.rooms.lock().await;
        let current = rooms.get(name).is_some_and(|h| h.instance() == instance);
        if !current {
            // Already replaced or removed; the sessions went with it.
            return;
        }
        rooms.remove(name);
        let revoked = self.sessions.lock().await.revoke_room(name);
        tracing::info!(room = name, revoked, "room deregistered");
    }
}

/// Manages all live rooms and the sessions that point into them.
///
/// This is the entry point for room operations from the transports.
/// Every method takes `&self`, so one registry is shared behind an `Arc`.
pub struct RoomRegistry {
    directory: Directory,
    deck: TopicDeck,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry with its own session store.
    pub fn new(deck: TopicDeck, config: RoomConfig) -> Self {
        Self::with_sessions(deck, config, Arc::new(Mutex::new(SessionStore::new())))
    }

    /// Creates an empty registry that issues sessions into `sessions`.
    pub fn with_sessions(
        deck: TopicDeck,
        config: RoomConfig,
        sessions: Arc<Mutex<SessionStore>>,
    ) -> Self {
        Self {
            directory: Directory {
                rooms: Arc::new(Mutex::new(HashMap::new())),
                sessions,
            },
            deck,
            config,
        }
    }

    /// The session store this registry issues into and revokes from.
    pub fn sessions(&self) -> &Arc<Mutex<SessionStore>> {
        &self.directory.sessions
    }

    /// Creates a room with `username` as its founding member.
    ///
    /// # Errors
    /// Returns [`RoomError::AlreadyExists`] if a live room has this name.
    pub async fn create_room(
        &self,
        name: &str,
        password: &str,
        username: &str,
    ) -> Result<Session, RoomError> {
        let mut rooms = self.directory.rooms.lock().await;
        let mut sessions = self.directory.sessions.lock().await;

        if let Some(existing) = rooms.get(name) {
            if !existing.is_closed() {
                return Err(RoomError::AlreadyExists(name.to_owned()));
            }
            // The old actor is on its way out; whatever it left behind
            // must not carry over to the new room.
            rooms.remove(name);
            sessions.revoke_room(name);
        }

        let token = sessions.create(username, name);
        let founder = User::founder(username, token.clone());
        let handle = spawn_room(
            name,
            password,
            founder,
            self.deck.clone(),
            &self.config,
            Some(self.directory.clone()),
        );
        rooms.insert(name.to_owned(), handle);

        tracing::info!(room = name, user = username, "room created");
        Ok(Session {
            token,
            username: username.to_owned(),
            room: name.to_owned(),
        })
    }

    /// Adds `username` to an existing room as a spectator.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no live room has this name
    /// - [`RoomError::NameTaken`] if the name is already a member
    pub async fn enter_room(
        &self,
        name: &str,
        username: &str,
    ) -> Result<Session, RoomError> {
        let handle = self.get_room(name).await?;

        let token = self.directory.sessions.lock().await.create(username, name);
        let result = handle.enter(User::newcomer(username, token.clone())).await;

        if let Err(e) = result {
            self.directory.sessions.lock().await.revoke(&token);
            return Err(match e {
                RoomError::Unavailable(room) => RoomError::NotFound(room),
                other => other,
            });
        }

        tracing::info!(room = name, user = username, "room entered");
        Ok(Session {
            token,
            username: username.to_owned(),
            room: name.to_owned(),
        })
    }

    /// Returns a handle to a live room.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if no live room has this name.
    pub async fn get_room(&self, name: &str) -> Result<RoomHandle, RoomError> {
        self.directory
            .rooms
            .lock()
            .await
            .get(name)
            .filter(|h| !h.is_closed())
            .cloned()
            .ok_or_else(|| RoomError::NotFound(name.to_owned()))
    }

    /// Removes the room if it has no members (or its actor has already
    /// stopped). Returns `true` if it was removed.
    pub async fn remove_room_if_empty(&self, name: &str) -> bool {
        let Some(handle) = self.directory.rooms.lock().await.get(name).cloned()
        else {
            return false;
        };

        let empty = match handle.info().await {
            Ok(info) => info.members.is_empty(),
            Err(_) => true,
        };
        if !empty {
            return false;
        }

        {
            let mut rooms = self.directory.rooms.lock().await;
            let current = rooms
                .get(name)
                .is_some_and(|h| h.instance() == handle.instance());
            if !current {
                return false;
            }
            rooms.remove(name);
            let revoked = self.directory.sessions.lock().await.revoke_room(name);
            tracing::info!(room = name, revoked, "empty room removed");
        }
        let _ = handle.shutdown().await;
        true
    }

    /// Returns the number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.directory
            .rooms
            .lock()
            .await
            .values()
            .filter(|h| !h.is_closed())
            .count()
    }

    /// Returns the names of all live rooms, sorted.
    pub async fn room_names(&self) -> Vec<String> {
        let rooms = self.directory.rooms.lock().await;
        let mut names: Vec<String> = rooms
            .iter()
            .filter(|(_, h)| !h.is_closed())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Shuts down every room. Used on server shutdown.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> =
            self.directory.rooms.lock().await.values().cloned().collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}
