// src/handlers/habits.rs

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
    models::habits::{CreateHabitTemplatePayload, DailyHabit, HabitTemplate, UpdateHabitTemplatePayload},
};

// GET /api/habits/today
pub async fn today(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<DailyHabit>>, AppError> {
    let today = app_state.clock.today();
    Ok(Json(app_state.habit_service.ensure_daily_habits(&user, today).await?))
}

// POST /api/habits/{id}/toggle
pub async fn toggle_habit(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(habit_id): Path<Uuid>,
) -> Result<Json<DailyHabit>, AppError> {
    Ok(Json(app_state.habit_service.toggle_habit(&user, habit_id).await?))
}

// GET /api/habits/templates
pub async fn list_templates(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<HabitTemplate>>, AppError> {
    Ok(Json(app_state.habit_service.list_templates(&user).await?))
}

// POST /api/habits/templates
pub async fn add_template(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateHabitTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.habit_service.add_template(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

// PATCH /api/habits/templates/{id}
pub async fn update_template(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(template_id): Path<Uuid>,
    Json(payload): Json<UpdateHabitTemplatePayload>,
) -> Result<Json<HabitTemplate>, AppError> {
    Ok(Json(
        app_state
            .habit_service
            .update_template(&user, template_id, payload)
            .await?,
    ))
}

// DELETE /api/habits/templates/{id}
pub async fn delete_template(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(template_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.habit_service.delete_template(&user, template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
