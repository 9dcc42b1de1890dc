// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{CreateUserPayload, Squad, UpdateUserPayload, User},
};

// GET /api/users
pub async fn list_users(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<User>>, AppError> {
    let users = app_state.auth_service.list_users(&actor).await?;
    Ok(Json(users))
}

// POST /api/users
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state.auth_service.create_user(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// PATCH /api/users/{id}
pub async fn update_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.update_user(&actor, user_id, payload).await?;
    Ok(Json(user))
}

// POST /api/users/{id}/toggle-status
pub async fn toggle_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.toggle_status(&actor, user_id).await?;
    Ok(Json(user))
}

// POST /api/users/{id}/reset-password
pub async fn reset_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.auth_service.reset_password(&actor, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/squads
pub async fn list_squads(
    State(app_state): State<AppState>,
    AuthenticatedUser(_actor): AuthenticatedUser,
) -> Result<Json<Vec<Squad>>, AppError> {
    Ok(Json(app_state.auth_service.list_squads().await?))
}
