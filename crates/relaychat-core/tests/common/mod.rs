//! Test utilities for driving relay sessions over in-memory transports.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc;
use futures::StreamExt;
use relaychat_core::{
    ChatMessage, ConnectionRegistry, ConversationStore, Frame, InMemoryConversationStore, MessageRouter, Session,
    SessionConfig, UserId,
};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding nothing was delivered.
pub const SILENCE: Duration = Duration::from_millis(100);

/// Install a tracing subscriber once so `RUST_LOG` works in tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A relay with a fresh registry and store.
pub struct TestRelay {
    pub store: Arc<InMemoryConversationStore>,
    pub router: Arc<MessageRouter>,
}

impl TestRelay {
    pub fn new() -> Self {
        init_tracing();
        let store = Arc::new(InMemoryConversationStore::new());
        let router = Arc::new(MessageRouter::new(
            Arc::new(ConnectionRegistry::new()),
            store.clone(),
        ));
        Self { store, router }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.router.registry()
    }

    /// Wait until the conversation between `a` and `b` holds `count` messages.
    pub async fn wait_for_history(&self, a: i64, b: i64, count: usize) -> Vec<ChatMessage> {
        timeout(DEFAULT_TIMEOUT, async {
            loop {
                let history = self
                    .store
                    .fetch(UserId(a), UserId(b))
                    .await
                    .expect("in-memory store does not fail");
                if history.len() >= count {
                    return history;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("messages were not stored in time")
    }

    /// Open a session for `id` and wait until it is the registered one.
    pub async fn connect(&self, id: i64) -> TestClient {
        let session = Session::new(UserId(id), Arc::clone(&self.router), SessionConfig::default());
        let connection = session.connection_id();

        let (inbound_tx, inbound_rx) = mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::unbounded();
        let task = tokio::spawn(session.run(inbound_rx, outbound_tx));

        let registry = Arc::clone(self.registry());
        timeout(DEFAULT_TIMEOUT, async move {
            loop {
                let current = registry.lookup(UserId(id)).map(|h| h.connection_id());
                if current == Some(connection) {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("session did not register in time");

        TestClient {
            inbound: inbound_tx,
            outbound: outbound_rx,
            task,
        }
    }
}

/// Client side of an in-memory session transport.
pub struct TestClient {
    inbound: mpsc::UnboundedSender<Result<Frame, Infallible>>,
    outbound: mpsc::UnboundedReceiver<Frame>,
    task: JoinHandle<()>,
}

impl TestClient {
    pub fn send_raw(&self, frame: Frame) {
        self.inbound
            .unbounded_send(Ok(frame))
            .expect("session is gone");
    }

    pub fn send(&self, sender_id: i64, receiver_id: i64, content: &str) {
        let json = serde_json::json!({
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "content": content,
        });
        self.send_raw(Frame::Text(json.to_string()));
    }

    /// Wait for the next delivered message.
    pub async fn recv(&mut self) -> ChatMessage {
        let frame = timeout(DEFAULT_TIMEOUT, self.outbound.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("transport closed");
        match frame {
            Frame::Text(text) => serde_json::from_str(&text).expect("delivered frame is a message"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    /// Assert nothing is delivered for a short while.
    pub async fn expect_silence(&mut self) {
        if let Ok(Some(frame)) = timeout(SILENCE, self.outbound.next()).await {
            panic!("unexpected delivery: {frame:?}");
        }
    }

    /// Close the connection and wait for the session to finish.
    pub async fn close(self) {
        self.send_raw(Frame::Close);
        timeout(DEFAULT_TIMEOUT, self.task)
            .await
            .expect("session did not close in time")
            .expect("session task panicked");
    }
}
