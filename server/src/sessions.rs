//! Player session registry
//!
//! Tracks which players are connected, the outbound channel used to reach
//! each of them, and which actor each player owns. Both mappings sit behind
//! one lock so that connect, disconnect and actor binding never interleave
//! halfway.
//!
//! Broadcasting works on a snapshot of the outbound handles: a session that
//! disappears while a broadcast is in flight simply shows up as a closed
//! channel, which the caller treats like any other failed send.

use log::info;
use shared::{EntityId, PlayerId, ServerMessage};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::mpsc;

/// Messages a session may have queued before it counts as stalled. One tick
/// queues three, so this is roughly twenty ticks of backlog.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Outbound half of a session. The network layer drains the receiving end
/// into the socket. Senders use `try_send`; a full queue is treated like a
/// closed one.
pub type Outbound = mpsc::Sender<ServerMessage>;

/// Creates the bounded channel backing one session.
pub fn outbound_channel() -> (Outbound, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// A connected player
#[derive(Debug)]
pub struct Session {
    pub id: PlayerId,
    pub connected_at: Instant,
    outbound: Outbound,
}

impl Session {
    fn new(id: PlayerId, outbound: Outbound) -> Self {
        Self {
            id,
            connected_at: Instant::now(),
            outbound,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    sessions: HashMap<PlayerId, Session>,
    actors: HashMap<PlayerId, EntityId>,
}

/// Concurrency-safe registry of sessions and the actors they own.
#[derive(Debug)]
pub struct SessionRegistry {
    inner: RwLock<Registry>,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Creates an empty registry that admits at most `max_sessions` players.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            max_sessions,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session.
    ///
    /// Returns false if the registry is full or the identifier is taken.
    pub fn add(&self, id: PlayerId, outbound: Outbound) -> bool {
        let mut registry = self.write();
        if registry.sessions.len() >= self.max_sessions || registry.sessions.contains_key(&id) {
            return false;
        }

        info!("Player {} connected", id);
        registry.sessions.insert(id.clone(), Session::new(id, outbound));
        true
    }

    /// Removes a session together with its actor binding.
    ///
    /// Returns the actor the player owned so the caller can take it off the
    /// map. Removing an unknown player is a no-op.
    pub fn remove(&self, id: &PlayerId) -> Option<EntityId> {
        let mut registry = self.write();
        let actor = registry.actors.remove(id);
        if let Some(session) = registry.sessions.remove(id) {
            info!(
                "Player {} disconnected after {:.1}s",
                session.id,
                session.connected_at.elapsed().as_secs_f32()
            );
        }
        actor
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.read().sessions.contains_key(id)
    }

    /// Binds an actor to a player. Fails if the player already owns one.
    pub fn bind_actor(&self, player: &PlayerId, actor: EntityId) -> bool {
        let mut registry = self.write();
        if registry.actors.contains_key(player) {
            return false;
        }
        registry.actors.insert(player.clone(), actor);
        true
    }

    pub fn actor_of(&self, player: &PlayerId) -> Option<EntityId> {
        self.read().actors.get(player).copied()
    }

    /// Drops the actor binding while keeping the session alive.
    pub fn release_actor(&self, player: &PlayerId) -> Option<EntityId> {
        self.write().actors.remove(player)
    }

    /// Snapshot of every live session's outbound channel.
    pub fn outbound_handles(&self) -> Vec<(PlayerId, Outbound)> {
        self.read()
            .sessions
            .values()
            .map(|session| (session.id.clone(), session.outbound.clone()))
            .collect()
    }

    /// Returns the number of connected players
    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().sessions.is_empty()
    }
}
