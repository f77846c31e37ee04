//! Wire messages exchanged over a session.
//!
//! Both directions carry one JSON object per frame:
//!
//! ```text
//! { "sender_id": 1, "receiver_id": 2, "content": "hi", "timestamp": "2024-05-01T12:00:00Z" }
//! ```
//!
//! The timestamp is assigned by the router at receipt time. A client-sent
//! timestamp is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ConversationKey, UserId};

/// A message as parsed from an inbound frame, before stamping.
///
/// Field presence is not validated: a structurally valid object with missing
/// or `null` fields parses with default values, and a bare `null` parses as an
/// all-default message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub sender_id: UserId,
    #[serde(deserialize_with = "null_as_default")]
    pub receiver_id: UserId,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl InboundMessage {
    /// Parse one frame payload.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Option<Self>>(payload).map(Option::unwrap_or_default)
    }

    /// Stamp the message with its receipt time.
    pub fn stamp(self, timestamp: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            timestamp,
        }
    }
}

/// A stamped message, as delivered to the recipient and recorded in the
/// conversation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// Server-assigned receipt time (RFC3339 on the wire)
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Key of the conversation this message belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.sender_id, self.receiver_id)
    }

    /// Serialize for delivery as a text frame.
    pub fn to_frame_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
