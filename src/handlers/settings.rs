// src/handlers/settings.rs

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        crm::PipelineStage,
        settings::{MessageTemplate, UpdateMessageTemplatePayload},
    },
};

// GET /api/settings/message-templates
pub async fn list_message_templates(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Json<Vec<MessageTemplate>>, AppError> {
    Ok(Json(app_state.template_service.list_templates().await?))
}

// PUT /api/settings/message-templates/{stage}
pub async fn upsert_message_template(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(stage): Path<String>,
    Json(payload): Json<UpdateMessageTemplatePayload>,
) -> Result<Json<MessageTemplate>, AppError> {
    let stage: PipelineStage = stage.parse()?;
    Ok(Json(
        app_state
            .template_service
            .upsert_template(&user, stage, payload)
            .await?,
    ))
}
