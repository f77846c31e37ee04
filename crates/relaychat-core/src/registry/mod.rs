//! Connection Registry for real-time message routing.
//!
//! Tracks which user is reachable right now. Each session registers a weak
//! reference to its outbound queue; the router looks recipients up here and
//! pushes frames onto their queue.
//!
//! ```text
//! Session (user 1) <-> ConnectionRegistry <-> Session (user 2)
//!        |                    |                      |
//!        v                    v                      v
//!  mpsc::Sender        RwLock<HashMap<UserId,   mpsc::Sender
//!                        WeakConnectionHandle>>
//! ```

mod connection_registry;

pub use connection_registry::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, SendResult, WeakConnectionHandle,
};
