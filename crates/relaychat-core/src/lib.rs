//! # relaychat-core
//!
//! Connection registry and message routing engine for Relaychat.
//!
//! Clients hold one persistent connection each, identified by a numeric user
//! id. Messages sent over a connection are recorded in a conversation store
//! and, if the recipient is connected at that moment, pushed onto the
//! recipient's connection.
//!
//! ## Architecture
//!
//! - **Connection Registry**: user id to live connection, one lock over the map
//! - **Message Router**: parse, stamp, record, deliver-if-present
//! - **Session**: one task per connection, reads frames in order and feeds the
//!   router; registers on start and unregisters on close
//! - **Conversation Store** / **Identity Directory**: injectable collaborators
//!   with in-memory implementations
//!
//! Delivery is fire-and-forget. There is no acknowledgment, retry, or ordering
//! guarantee across senders, and claimed identities are not authenticated.

pub mod directory;
pub mod message;
pub mod registry;
pub mod routing;
pub mod session;
pub mod store;

mod error;
mod types;

pub use directory::{IdentityDirectory, InMemoryIdentityDirectory, User};
pub use error::{DirectoryError, RelayError, StoreError};
pub use message::{ChatMessage, InboundMessage};
pub use registry::{ConnectionHandle, ConnectionRegistry, SendResult};
pub use routing::{MessageRouter, RouteOutcome, RouterStatsSnapshot};
pub use session::{Session, SessionConfig};
pub use store::{ConversationStore, InMemoryConversationStore};
pub use types::*;
