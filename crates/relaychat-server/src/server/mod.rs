use crate::config::ServerConfig;
use anyhow::Result;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use relaychat_core::{
    ConnectionRegistry, ConversationStore, IdentityDirectory, InMemoryConversationStore,
    InMemoryIdentityDirectory, MessageRouter, SessionConfig,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

mod error;
mod routes;

pub use error::ApiError;

/// Server application state
pub struct AppState {
    /// Routes frames to the store and to live connections
    pub router: Arc<MessageRouter>,
    /// Issues user ids for registration and login
    pub directory: Arc<dyn IdentityDirectory>,
    /// Settings applied to every new session
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(
        router: Arc<MessageRouter>,
        directory: Arc<dyn IdentityDirectory>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            router,
            directory,
            session_config,
        }
    }

    /// Build in-memory state from the server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(InMemoryConversationStore::new());
        let router = Arc::new(MessageRouter::new(registry, store));

        let directory: Arc<dyn IdentityDirectory> = if config.seed_users {
            Arc::new(InMemoryIdentityDirectory::with_seed_users())
        } else {
            Arc::new(InMemoryIdentityDirectory::new())
        };

        Self::new(router, directory, config.session_config())
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.router.registry()
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        self.router.store()
    }
}

/// Start the HTTP server
pub async fn start(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config));

    let app = create_router(state);

    info!("Starting Axum HTTP server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

/// Create the Axum router with all routes and middleware
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .merge(routes::websocket::router())
        .merge(routes::users::router())
        .merge(routes::messages::router())
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

async fn home_handler() -> &'static str {
    "home page"
}

/// Health check with live relay counters
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "relaychat-server",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.registry().connection_count(),
        "conversations": state.store().conversation_count().await,
        "routing": state.router.stats(),
    }))
}
