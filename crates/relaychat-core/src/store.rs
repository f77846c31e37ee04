//! Conversation Store
//!
//! Append-only message history keyed by the unordered pair of participants.
//! The router records every parsed message here, whether or not the recipient
//! is online.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::message::ChatMessage;
use crate::types::{ConversationKey, UserId};
use crate::StoreError;

/// Trait for conversation stores.
///
/// Implementations can be in-memory (single process) or backed by an external
/// service shared between relay instances.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a message to the conversation between its sender and receiver.
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Fetch the conversation between `a` and `b` in insertion order.
    ///
    /// The argument order does not matter.
    async fn fetch(&self, a: UserId, b: UserId) -> Result<Vec<ChatMessage>, StoreError>;

    /// Number of conversations with at least one message.
    async fn conversation_count(&self) -> usize;
}

/// In-memory conversation store.
///
/// Lost on restart. Readers share the lock; appends take it exclusively.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationKey, Vec<ChatMessage>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let key = message.conversation_key();
        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let history = conversations.entry(key).or_default();
        history.push(message.clone());

        debug!(conversation = %key, count = history.len(), "Appended message");
        Ok(())
    }

    async fn fetch(&self, a: UserId, b: UserId) -> Result<Vec<ChatMessage>, StoreError> {
        let key = ConversationKey::new(a, b);
        let conversations = self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(conversations.get(&key).cloned().unwrap_or_default())
    }

    async fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
