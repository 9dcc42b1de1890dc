// src/handlers/goals.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::goals::{Goal, GoalProgress, SetGoalPayload},
};

// GET /api/goals
pub async fn current_progress(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<GoalProgress>>, AppError> {
    Ok(Json(app_state.goal_service.current_goal_progress(&user).await?))
}

// PUT /api/goals
pub async fn set_goal(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SetGoalPayload>,
) -> Result<Json<Goal>, AppError> {
    Ok(Json(app_state.goal_service.set_goal(&user, payload).await?))
}
