//! Connection Registry implementation.
//!
//! Maps each user id to the outbound queue of its live session.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::types::{Frame, UserId};

/// Identifies one physical connection, distinct from the user id it claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of attempting to push a frame onto a connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Frame was queued for delivery
    Sent,
    /// The connection's queue is full
    ChannelFull,
    /// The connection's writer has gone away
    ChannelClosed,
}

/// Strong handle to a session's outbound queue.
///
/// The owning session holds one of these for its whole lifetime. Frames pushed
/// here are written to the transport by the session's writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            sender,
        };
        (handle, receiver)
    }

    /// The physical connection this handle writes to.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting for capacity.
    pub fn try_send(&self, frame: Frame) -> SendResult {
        match self.sender.try_send(frame) {
            Ok(()) => SendResult::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => SendResult::ChannelFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendResult::ChannelClosed,
        }
    }

    /// Check whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Create a non-owning reference for the registry.
    pub fn downgrade(&self) -> WeakConnectionHandle {
        WeakConnectionHandle {
            id: self.id,
            sender: self.sender.downgrade(),
        }
    }
}

/// Non-owning reference to a session's outbound queue.
///
/// Holding one neither keeps the queue open nor closes it.
#[derive(Debug, Clone)]
pub struct WeakConnectionHandle {
    id: ConnectionId,
    sender: mpsc::WeakSender<Frame>,
}

impl WeakConnectionHandle {
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Upgrade to a strong handle, `None` once the owning session is gone.
    pub fn upgrade(&self) -> Option<ConnectionHandle> {
        self.sender.upgrade().map(|sender| ConnectionHandle {
            id: self.id,
            sender,
        })
    }
}

/// Registry of live connections keyed by user id.
///
/// Holds at most one entry per user. The whole map sits behind a single
/// `RwLock`; lookups share the read side, register/unregister take the write
/// side. The lock is never held across an await point.
///
/// ## Usage
///
/// ```ignore
/// let registry = ConnectionRegistry::new();
///
/// // When a session is established:
/// let (handle, rx) = ConnectionHandle::channel(256);
/// registry.register(user_id, &handle);
///
/// // When routing a message:
/// if let Some(handle) = registry.lookup(recipient) {
///     handle.try_send(Frame::Text(json));
/// }
///
/// // When the session ends:
/// registry.unregister(user_id);
/// ```
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, WeakConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create a new connection registry.
    pub fn new() -> Self {
        info!("Creating connection registry");
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated, every
    // critical section is a single HashMap call.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, WeakConnectionHandle>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserId, WeakConnectionHandle>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection for `id`.
    ///
    /// A previous entry for the same id is dropped from the map without being
    /// closed or notified. Its session keeps running but is no longer
    /// reachable through the registry. Returns true if an entry was replaced.
    #[instrument(skip(self, handle), fields(user_id = %id, connection = %handle.connection_id()))]
    pub fn register(&self, id: UserId, handle: &ConnectionHandle) -> bool {
        let existing = self.write().insert(id, handle.downgrade());
        match existing {
            Some(previous) => {
                debug!(superseded = %previous.connection_id(), "Replaced existing connection registration");
                true
            }
            None => {
                debug!("Registered new connection");
                false
            }
        }
    }

    /// Remove the entry for `id`.
    ///
    /// Idempotent: removing an absent id is a no-op. Returns true if an entry
    /// was removed.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn unregister(&self, id: UserId) -> bool {
        let removed = self.write().remove(&id);
        if removed.is_some() {
            debug!("Unregistered connection");
        } else {
            debug!("Connection was not registered");
        }
        removed.is_some()
    }

    /// Look up the current handle for `id`.
    ///
    /// The returned handle may be superseded or unregistered as soon as this
    /// returns; writes through it are best-effort.
    pub fn lookup(&self, id: UserId) -> Option<ConnectionHandle> {
        self.read().get(&id).and_then(WeakConnectionHandle::upgrade)
    }

    /// Check if a user currently has a live registered connection.
    pub fn is_connected(&self, id: UserId) -> bool {
        self.lookup(id).is_some()
    }

    /// Get the number of registry entries.
    pub fn connection_count(&self) -> usize {
        self.read().len()
    }

    /// List all registered user ids in ascending order.
    pub fn list_connections(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.connection_count())
            .finish()
    }
}
