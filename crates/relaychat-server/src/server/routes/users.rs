//! Identity routes: registration, login and the user list.
//!
//! There are no credentials. Login succeeds for any exact first/last name pair
//! already in the directory and returns the issued id.

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use relaychat_core::User;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::server::{ApiError, AppState};

/// Request body for `/register` and `/login`
///
/// Absent names are treated as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NameRequest {
    pub first_name: String,
    pub last_name: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/users", get(list_users_handler))
}

#[instrument(skip_all)]
async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NameRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .directory
        .add_user(&request.first_name, &request.last_name)
        .await?;
    info!(user_id = %user.id, "User registered");
    Ok(Json(user))
}

#[instrument(skip_all)]
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NameRequest>,
) -> Result<Json<User>, ApiError> {
    match state
        .directory
        .find_user(&request.first_name, &request.last_name)
        .await?
    {
        Some(user) => {
            info!(user_id = %user.id, "User logged in");
            Ok(Json(user))
        }
        None => {
            info!("Login rejected for unknown user");
            Err(ApiError::Forbidden)
        }
    }
}

async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.directory.list_users().await?))
}
