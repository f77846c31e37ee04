//! Conversation history route.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use relaychat_core::{ChatMessage, RelayError, UserId};
use tracing::debug;

use super::{first_param, QueryPairs};
use crate::server::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/messages", get(history_handler))
}

fn participant(raw: Option<&str>, name: &str) -> Result<UserId, ApiError> {
    UserId::from_param(raw).map_err(|e| match e {
        RelayError::MissingUserId => {
            ApiError::MissingParameter("userId1 and userId2 are required".to_string())
        }
        _ => ApiError::InvalidParameter(format!("Invalid {name}")),
    })
}

/// Messages exchanged between two users in either direction, oldest first.
async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueryPairs>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let a = participant(first_param(&query, "userId1"), "userId1")?;
    let b = participant(first_param(&query, "userId2"), "userId2")?;

    let history = state.store().fetch(a, b).await?;
    debug!(user_a = %a, user_b = %b, count = history.len(), "Fetched history");

    Ok(Json(history))
}
