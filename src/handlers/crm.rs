// src/handlers/crm.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        crm::{
            ChangeStagePayload, CreateLeadPayload, CreateTaskPayload, Lead, LeadFilter, LeadView, NotePayload,
            PipelineStage, Task, UpdateLeadPayload,
        },
        dashboard::{PipelineBoard, Workspace},
        settings::RenderedMessage,
    },
};

// =============================================================================
//  ÁREA 1: CARGA DA TELA PRINCIPAL
// =============================================================================

// GET /api/crm/workspace
pub async fn load_workspace(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service.load_workspace(&user).await?;
    Ok(Json(workspace))
}

// =============================================================================
//  ÁREA 2: LEADS
// =============================================================================

// GET /api/crm/leads?squadId=&ownerId=&q=
pub async fn list_leads(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<LeadFilter>,
) -> Result<Json<Vec<LeadView>>, AppError> {
    Ok(Json(app_state.crm_service.list_lead_views(&user, &filter).await?))
}

// POST /api/crm/leads
pub async fn create_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.crm_service.create_lead(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(app_state.crm_service.classify(lead))))
}

// GET /api/crm/leads/{id}
pub async fn get_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadView>, AppError> {
    let lead = app_state.crm_service.get_lead(&user, lead_id).await?;
    Ok(Json(app_state.crm_service.classify(lead)))
}

// PATCH /api/crm/leads/{id}
pub async fn update_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<Json<LeadView>, AppError> {
    let lead = app_state.crm_service.update_lead(&user, lead_id, payload).await?;
    Ok(Json(app_state.crm_service.classify(lead)))
}

// DELETE /api/crm/leads/{id}
pub async fn delete_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.crm_service.delete_lead(&user, lead_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/crm/leads/{id}/stage
pub async fn change_stage(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<ChangeStagePayload>,
) -> Result<Json<LeadView>, AppError> {
    let lead = app_state
        .crm_service
        .change_stage_str(&user, lead_id, &payload.stage)
        .await?;
    Ok(Json(app_state.crm_service.classify(lead)))
}

// POST /api/crm/leads/{id}/notes
pub async fn append_note(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead: Lead = app_state
        .crm_service
        .append_note(&user, lead_id, &payload.content, payload.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(app_state.crm_service.classify(lead))))
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    // Ausente = estágio atual do lead
    pub stage: Option<String>,
}

// GET /api/crm/leads/{id}/message?stage=
pub async fn render_message(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<RenderedMessage>, AppError> {
    let lead = app_state.crm_service.get_lead(&user, lead_id).await?;
    let stage = match query.stage {
        Some(raw) => raw.parse::<PipelineStage>()?,
        None => lead.stage,
    };
    let message = app_state
        .template_service
        .suggest_message(stage, &lead, Some(&user))
        .await?;
    Ok(Json(message))
}

// GET /api/crm/board?squadId=&ownerId=&q=
pub async fn pipeline_board(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<LeadFilter>,
) -> Result<Json<PipelineBoard>, AppError> {
    Ok(Json(app_state.crm_service.board(&user, &filter).await?))
}

// GET /api/crm/queue
pub async fn follow_up_queue(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<LeadView>>, AppError> {
    let queue = app_state.crm_service.queue(&user).await?;
    Ok(Json(
        queue.into_iter().map(|l| app_state.crm_service.classify(l)).collect(),
    ))
}

// =============================================================================
//  ÁREA 3: TAREFAS
// =============================================================================

// GET /api/crm/tasks
pub async fn list_tasks(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(app_state.crm_service.list_tasks(&user).await?))
}

// POST /api/crm/tasks
pub async fn create_task(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.crm_service.create_task(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

// POST /api/crm/tasks/{id}/toggle
pub async fn toggle_task(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(app_state.crm_service.toggle_task(&user, task_id).await?))
}

// DELETE /api/crm/tasks/{id}
pub async fn delete_task(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.crm_service.delete_task(&user, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
