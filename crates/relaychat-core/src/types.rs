//! Common types for the relay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Numeric identity of a chat participant, issued by the identity directory.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Parse a user id supplied by a connecting client.
    ///
    /// `None` and blank input are reported as missing; anything that is not
    /// an integer is invalid.
    pub fn from_param(raw: Option<&str>) -> Result<Self, RelayError> {
        match raw {
            None => Err(RelayError::MissingUserId),
            Some(s) if s.is_empty() => Err(RelayError::MissingUserId),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RelayError::MissingUserId);
        }
        s.parse::<i64>()
            .map(UserId)
            .map_err(|_| RelayError::invalid_user_id(s))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Unordered pair of user ids naming one two-party conversation.
///
/// Always stored with the smaller id first, so `new(a, b) == new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    /// Create the canonical key for a conversation between `a` and `b`.
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The smaller participant id.
    pub fn low(&self) -> UserId {
        self.low
    }

    /// The larger participant id.
    pub fn high(&self) -> UserId {
        self.high
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport upgrade in progress, identity not yet validated
    Connecting,
    /// Registered in the connection registry
    Registered,
    /// Reading inbound frames
    Reading,
    /// Unregistered, connection released
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Registered => write!(f, "registered"),
            SessionState::Reading => write!(f, "reading"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// A single transport frame.
///
/// Keeps sessions independent of the WebSocket library in use; the server
/// maps its socket messages onto these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl Frame {
    /// Payload of a data frame, `None` for control frames.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(text) => Some(text.as_bytes()),
            Frame::Binary(data) => Some(data),
            Frame::Ping(_) | Frame::Pong(_) | Frame::Close => None,
        }
    }

    /// Frame kind name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
            Frame::Ping(_) => "ping",
            Frame::Pong(_) => "pong",
            Frame::Close => "close",
        }
    }
}
