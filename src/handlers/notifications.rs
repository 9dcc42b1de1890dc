// src/handlers/notifications.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::notifications::NotificationFeed,
};

// GET /api/notifications
pub async fn list(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<NotificationFeed> {
    Json(app_state.notification_service.feed(user.id).await)
}

// POST /api/notifications/evaluate
// Roda o ciclo de carga completo, que termina avaliando as regras.
pub async fn evaluate(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<NotificationFeed>, AppError> {
    let workspace = app_state.workspace_service.load_workspace(&user).await?;
    Ok(Json(workspace.notifications))
}

// POST /api/notifications/{id}/read
pub async fn mark_as_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> Json<NotificationFeed> {
    Json(
        app_state
            .notification_service
            .mark_as_read(user.id, notification_id)
            .await,
    )
}

// POST /api/notifications/read-all
pub async fn mark_all_as_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<NotificationFeed> {
    Json(app_state.notification_service.mark_all_as_read(user.id).await)
}

// DELETE /api/notifications
pub async fn clear_all(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<NotificationFeed> {
    Json(app_state.notification_service.clear_all(user.id).await)
}
