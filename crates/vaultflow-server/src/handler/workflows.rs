//! Workflow CRUD, compilation and lifecycle handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use vaultflow_runtime::CompileOutcome;
use vaultflow_runtime::definition::{WorkflowDefinition, WorkflowStatus};
use vaultflow_runtime::store::{WorkflowId, WorkflowRecord};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Tracing target for workflow handlers.
const TRACING_TARGET: &str = "vaultflow_server::handler::workflows";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", post(create_workflow).get(list_workflows))
        .route("/workflows/{id}", get(get_workflow).put(update_workflow))
        .route("/workflows/{id}/compile", post(compile_workflow))
        .route("/workflows/{id}/status", patch(set_status))
        .route("/workflows/{id}/priority", patch(set_priority))
}

async fn create_workflow(
    State(state): State<AppState>,
    Json(definition): Json<WorkflowDefinition>,
) -> Result<(StatusCode, Json<WorkflowRecord>)> {
    let record = state.service().create_workflow(definition)?;
    tracing::debug!(target: TRACING_TARGET, workflow_id = %record.id, "workflow created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_workflows(State(state): State<AppState>) -> Result<Json<Vec<WorkflowRecord>>> {
    Ok(Json(state.service().list_workflows()?))
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowRecord>> {
    let record = state.service().get_workflow(WorkflowId::from_uuid(id))?;
    Ok(Json(record))
}

async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(definition): Json<WorkflowDefinition>,
) -> Result<Json<WorkflowRecord>> {
    let record = state
        .service()
        .update_definition(WorkflowId::from_uuid(id), definition)?;
    Ok(Json(record))
}

async fn compile_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowRecord>> {
    match state.service().compile_workflow(WorkflowId::from_uuid(id))? {
        CompileOutcome::Compiled { record } => Ok(Json(record)),
        CompileOutcome::Invalid { errors } => Err(ApiError::Validation(errors)),
    }
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: WorkflowStatus,
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<WorkflowRecord>> {
    let record = state
        .service()
        .set_status(WorkflowId::from_uuid(id), request.status)?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct SetPriorityRequest {
    priority: i32,
}

async fn set_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPriorityRequest>,
) -> Result<Json<WorkflowRecord>> {
    let record = state
        .service()
        .set_priority(WorkflowId::from_uuid(id), request.priority)?;
    Ok(Json(record))
}
