use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use crate::auth::extractors::AuthUser;
use crate::error::Result;
use crate::state::AppState;

use super::domain::{PublicUser, UserPatch};
use super::dto::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse, UsersResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state
        .users
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state.users.login(&payload.email, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UsersResponse>> {
    debug!(requested_by = %user_id, "listing users");
    let users = state.users.list_users().await?;
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>> {
    Ok(Json(state.users.get_user(&id).await?))
}

#[instrument(skip(state, patch))]
async fn update_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<PublicUser>> {
    Ok(Json(state.users.update_user(&id, patch).await?))
}

#[instrument(skip(state))]
async fn delete_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.users.delete_user(&id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}
