// src/handlers/dashboard.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::dashboard::{PipelineStats, SquadPerformance},
};

// GET /api/dashboard/stats
pub async fn get_stats(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<PipelineStats>, AppError> {
    Ok(Json(app_state.dashboard_service.stats(&user).await?))
}

// GET /api/dashboard/squads/{id}/performance
pub async fn squad_performance(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(squad_id): Path<Uuid>,
) -> Result<Json<SquadPerformance>, AppError> {
    Ok(Json(app_state.dashboard_service.squad_performance(&user, squad_id).await?))
}
