//! Message routing.
//!
//! The `MessageRouter` turns one inbound frame into a durable record and a
//! best-effort live delivery.
//!
//! # Routing Logic
//!
//! For each frame, the router:
//! 1. Parses the payload as an [`InboundMessage`]; malformed frames are logged
//!    and dropped
//! 2. Stamps the message with the receipt time
//! 3. Appends it to the [`ConversationStore`], whether or not the recipient is
//!    online
//! 4. Looks the recipient up in the [`ConnectionRegistry`] and, if present,
//!    queues the serialized message on its connection
//!
//! Nothing is reported back to the sender in any branch. Delivery is
//! fire-and-forget: no retry, no acknowledgment, no backpressure.
//!
//! # Example
//!
//! ```ignore
//! use relaychat_core::MessageRouter;
//!
//! let router = MessageRouter::new(registry, store);
//! let outcome = router.route(br#"{"sender_id":1,"receiver_id":2,"content":"hi"}"#).await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::message::InboundMessage;
use crate::registry::{ConnectionRegistry, SendResult};
use crate::store::ConversationStore;
use crate::types::Frame;

/// Result of routing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The frame did not parse and was dropped
    Malformed,
    /// The message was queued on the recipient's connection
    Delivered,
    /// The recipient has no registered connection
    RecipientOffline,
    /// The recipient is registered but its queue rejected the frame
    DeliveryFailed(SendResult),
}

/// Counters for routed frames.
#[derive(Debug, Default)]
pub struct RouterStats {
    routed: AtomicU64,
    delivered: AtomicU64,
    offline: AtomicU64,
    malformed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStatsSnapshot {
    pub routed: u64,
    pub delivered: u64,
    pub offline: u64,
    pub malformed: u64,
    pub failed: u64,
}

impl RouterStats {
    fn record(&self, outcome: RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Malformed => &self.malformed,
            RouteOutcome::Delivered => &self.delivered,
            RouteOutcome::RecipientOffline => &self.offline,
            RouteOutcome::DeliveryFailed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if outcome != RouteOutcome::Malformed {
            self.routed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            routed: self.routed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            offline: self.offline.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Routes inbound frames to the conversation store and to live recipients.
pub struct MessageRouter {
    /// Live connections, looked up per message
    registry: Arc<ConnectionRegistry>,
    /// Durable record of every parsed message
    store: Arc<dyn ConversationStore>,
    stats: RouterStats,
}

impl MessageRouter {
    /// Create a new message router.
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            registry,
            store,
            stats: RouterStats::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Route one inbound frame payload.
    ///
    /// Never fails: every error is logged and reflected in the returned
    /// outcome only.
    #[instrument(name = "relay.route", skip(self, payload), fields(len = payload.len()))]
    pub async fn route(&self, payload: &[u8]) -> RouteOutcome {
        let outcome = self.route_inner(payload).await;
        self.stats.record(outcome);
        outcome
    }

    async fn route_inner(&self, payload: &[u8]) -> RouteOutcome {
        let inbound = match InboundMessage::parse(payload) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return RouteOutcome::Malformed;
            }
        };

        let message = inbound.stamp(Utc::now());
        let receiver = message.receiver_id;
        debug!(
            sender = %message.sender_id,
            receiver = %receiver,
            content = %message.content,
            "Received message"
        );

        if let Err(e) = self.store.append(&message).await {
            warn!(error = %e, conversation = %message.conversation_key(), "Failed to record message");
        }

        let Some(handle) = self.registry.lookup(receiver) else {
            info!(receiver = %receiver, "Recipient offline, message stored only");
            return RouteOutcome::RecipientOffline;
        };

        let text = match message.to_frame_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize message for delivery");
                return RouteOutcome::DeliveryFailed(SendResult::ChannelClosed);
            }
        };

        match handle.try_send(Frame::Text(text)) {
            SendResult::Sent => {
                debug!(receiver = %receiver, connection = %handle.connection_id(), "Message queued for delivery");
                RouteOutcome::Delivered
            }
            result => {
                warn!(
                    receiver = %receiver,
                    connection = %handle.connection_id(),
                    result = ?result,
                    "Delivery failed"
                );
                RouteOutcome::DeliveryFailed(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatMessage;
    use crate::registry::ConnectionHandle;
    use crate::store::InMemoryConversationStore;
    use crate::types::UserId;
    use crate::StoreError;
    use async_trait::async_trait;

    fn setup() -> (Arc<ConnectionRegistry>, Arc<InMemoryConversationStore>, MessageRouter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(InMemoryConversationStore::new());
        let router = MessageRouter::new(Arc::clone(&registry), store.clone());
        (registry, store, router)
    }

    fn frame(from: i64, to: i64, content: &str) -> Vec<u8> {
        serde_json::json!({ "sender_id": from, "receiver_id": to, "content": content })
            .to_string()
            .into_bytes()
    }

    #[tokio::test]
    async fn test_route_to_connected_recipient() {
        let (registry, store, router) = setup();
        let (handle, mut rx) = ConnectionHandle::channel(16);
        registry.register(UserId(2), &handle);

        let before = Utc::now();
        let outcome = router.route(&frame(1, 2, "hi")).await;
        assert_eq!(outcome, RouteOutcome::Delivered);

        let Some(Frame::Text(text)) = rx.recv().await else {
            panic!("expected a text frame");
        };
        let delivered: ChatMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(delivered.sender_id, UserId(1));
        assert_eq!(delivered.receiver_id, UserId(2));
        assert_eq!(delivered.content, "hi");
        assert!(delivered.timestamp >= before);

        let history = store.fetch(UserId(1), UserId(2)).await.unwrap();
        assert_eq!(history, vec![delivered]);
    }

    #[tokio::test]
    async fn test_route_to_offline_recipient_still_stores() {
        let (_registry, store, router) = setup();

        let outcome = router.route(&frame(1, 99, "anyone?")).await;
        assert_eq!(outcome, RouteOutcome::RecipientOffline);

        let history = store.fetch(UserId(99), UserId(1)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "anyone?");
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let (_registry, store, router) = setup();

        assert_eq!(router.route(b"not json").await, RouteOutcome::Malformed);
        assert_eq!(store.conversation_count().await, 0);
        assert_eq!(router.stats().malformed, 1);
        assert_eq!(router.stats().routed, 0);
    }

    #[tokio::test]
    async fn test_null_fields_are_stored_with_defaults() {
        let (registry, store, router) = setup();
        let (handle, mut rx) = ConnectionHandle::channel(4);
        registry.register(UserId(2), &handle);

        let outcome = router
            .route(br#"{"sender_id":1,"receiver_id":2,"content":null}"#)
            .await;
        assert_eq!(outcome, RouteOutcome::Delivered);
        assert!(rx.try_recv().is_ok());

        let outcome = router
            .route(br#"{"sender_id":null,"receiver_id":7,"content":"who"}"#)
            .await;
        assert_eq!(outcome, RouteOutcome::RecipientOffline);

        assert_eq!(router.route(b"null").await, RouteOutcome::RecipientOffline);

        let history = store.fetch(UserId(1), UserId(2)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].content.is_empty());
        assert_eq!(store.fetch(UserId(0), UserId(7)).await.unwrap().len(), 1);
        assert_eq!(store.fetch(UserId(0), UserId(0)).await.unwrap().len(), 1);
        assert_eq!(router.stats().malformed, 0);
    }

    #[tokio::test]
    async fn test_server_assigns_timestamp() {
        let (_registry, store, router) = setup();
        let payload = br#"{"sender_id":1,"receiver_id":2,"content":"x","timestamp":"1999-01-01T00:00:00Z"}"#;

        let before = Utc::now();
        router.route(payload).await;

        let history = store.fetch(UserId(1), UserId(2)).await.unwrap();
        assert!(history[0].timestamp >= before);
    }

    #[tokio::test]
    async fn test_full_recipient_queue_is_swallowed() {
        let (registry, store, router) = setup();
        let (handle, _rx) = ConnectionHandle::channel(1);
        registry.register(UserId(2), &handle);

        assert_eq!(router.route(&frame(1, 2, "one")).await, RouteOutcome::Delivered);
        assert_eq!(
            router.route(&frame(1, 2, "two")).await,
            RouteOutcome::DeliveryFailed(SendResult::ChannelFull)
        );

        // Both are recorded regardless
        assert_eq!(store.fetch(UserId(1), UserId(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_recipient_queue_is_swallowed() {
        let (registry, _store, router) = setup();
        let (handle, rx) = ConnectionHandle::channel(4);
        registry.register(UserId(2), &handle);
        drop(rx);

        assert_eq!(
            router.route(&frame(1, 2, "late")).await,
            RouteOutcome::DeliveryFailed(SendResult::ChannelClosed)
        );
        assert_eq!(router.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_delivery_goes_to_latest_registration() {
        let (registry, _store, router) = setup();
        let (first, mut rx1) = ConnectionHandle::channel(4);
        let (second, mut rx2) = ConnectionHandle::channel(4);
        registry.register(UserId(1), &first);
        registry.register(UserId(1), &second);

        router.route(&frame(2, 1, "hello")).await;

        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
    }

    struct FailingStore;

    #[async_trait]
    impl ConversationStore for FailingStore {
        async fn append(&self, _message: &ChatMessage) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn fetch(&self, _a: UserId, _b: UserId) -> Result<Vec<ChatMessage>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn conversation_count(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_delivery() {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = MessageRouter::new(Arc::clone(&registry), Arc::new(FailingStore));
        let (handle, mut rx) = ConnectionHandle::channel(4);
        registry.register(UserId(2), &handle);

        assert_eq!(router.route(&frame(1, 2, "hi")).await, RouteOutcome::Delivered);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let (registry, _store, router) = setup();
        let (handle, _rx) = ConnectionHandle::channel(4);
        registry.register(UserId(2), &handle);

        router.route(&frame(1, 2, "a")).await;
        router.route(&frame(1, 3, "b")).await;
        router.route(b"{").await;

        assert_eq!(
            router.stats(),
            RouterStatsSnapshot {
                routed: 2,
                delivered: 1,
                offline: 1,
                malformed: 1,
                failed: 0,
            }
        );
    }
}
