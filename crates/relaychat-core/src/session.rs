//! Connection session: owns one physical connection from upgrade to cleanup.
//!
//! ```text
//! Connecting --(valid userId)--> Registered --> Reading --(close / read error)--> Closed
//!     |
//!     +--(missing / invalid userId)--> rejected, never registered
//! ```
//!
//! A session reads frames strictly in arrival order and hands data frames to
//! the [`MessageRouter`]. Outbound frames (deliveries from other sessions and
//! pong replies) go through a bounded queue drained by a dedicated writer task,
//! so a slow peer never stalls the router.

use std::fmt;
use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::registry::{ConnectionHandle, ConnectionId, SendResult};
use crate::routing::MessageRouter;
use crate::types::{Frame, SessionState, UserId};
use crate::RelayError;

/// Default capacity of a session's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Per-session settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Frames that may be queued for a connection before deliveries to it fail
    pub outbound_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// One connection's lifecycle owner.
pub struct Session {
    user_id: UserId,
    state: SessionState,
    handle: ConnectionHandle,
    outbound: mpsc::Receiver<Frame>,
    router: Arc<MessageRouter>,
}

impl Session {
    /// Validate the claimed identity and create a session in `Connecting`.
    ///
    /// Fails before anything is registered when the id is missing or not an
    /// integer. The claimed id is not authenticated.
    pub fn connect(
        raw_user_id: Option<&str>,
        router: Arc<MessageRouter>,
        config: SessionConfig,
    ) -> Result<Self, RelayError> {
        let user_id = UserId::from_param(raw_user_id).map_err(|e| {
            info!(error = %e, "Rejected connection");
            e
        })?;
        Ok(Self::new(user_id, router, config))
    }

    /// Create a session for an already validated id.
    pub fn new(user_id: UserId, router: Arc<MessageRouter>, config: SessionConfig) -> Self {
        let (handle, outbound) = ConnectionHandle::channel(config.outbound_buffer);
        Self {
            user_id,
            state: SessionState::Connecting,
            handle,
            outbound,
            router,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.handle.connection_id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session over an established transport until it closes.
    ///
    /// `frames` yields inbound frames; `sink` receives outbound ones. The
    /// session ends on a `Close` frame, a read error, or end of stream, and
    /// always unregisters itself before returning.
    #[instrument(
        name = "relay.session",
        skip_all,
        fields(user_id = %self.user_id, connection = %self.handle.connection_id())
    )]
    pub async fn run<S, E, K>(self, mut frames: S, sink: K)
    where
        S: Stream<Item = Result<Frame, E>> + Unpin + Send,
        E: fmt::Display + Send,
        K: Sink<Frame> + Unpin + Send + 'static,
        K::Error: fmt::Display + Send,
    {
        let Session {
            user_id,
            mut state,
            handle,
            outbound,
            router,
        } = self;
        let registry = Arc::clone(router.registry());

        registry.register(user_id, &handle);
        transition(&mut state, SessionState::Registered);
        info!("Client connected");

        let writer = tokio::spawn(write_frames(outbound, sink).in_current_span());

        transition(&mut state, SessionState::Reading);
        while let Some(item) = frames.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(error = %e, "Read failed, closing session");
                    break;
                }
            };

            match frame {
                Frame::Ping(data) => {
                    if handle.try_send(Frame::Pong(data)) != SendResult::Sent {
                        debug!("Could not queue pong");
                    }
                }
                Frame::Pong(_) => {}
                Frame::Close => {
                    debug!("Close requested by peer");
                    break;
                }
                data => {
                    if let Some(payload) = data.payload() {
                        router.route(payload).await;
                    }
                }
            }
        }

        registry.unregister(user_id);
        transition(&mut state, SessionState::Closed);

        // Dropping the last strong sender lets the writer drain and stop.
        drop(handle);
        if let Err(e) = writer.await {
            warn!(error = %e, "Writer task failed");
        }

        info!("Client disconnected");
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug!(from = %state, to = %next, "Session state change");
    *state = next;
}

/// Drain a session's outbound queue into its transport.
///
/// Stops at the first write failure; later deliveries to this connection then
/// fail as closed.
async fn write_frames<K>(mut outbound: mpsc::Receiver<Frame>, mut sink: K)
where
    K: Sink<Frame> + Unpin,
    K::Error: fmt::Display,
{
    while let Some(frame) = outbound.recv().await {
        let kind = frame.name();
        if let Err(e) = sink.send(frame).await {
            warn!(error = %e, frame = kind, "Failed to write frame");
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "Failed to close transport");
    }
}
