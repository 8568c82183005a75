//! Event ingestion handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use vaultflow_runtime::event::Event;
use vaultflow_runtime::store::WorkflowId;

use crate::error::Result;
use crate::state::AppState;

/// Tracing target for event handlers.
const TRACING_TARGET: &str = "vaultflow_server::handler::events";

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/events", post(ingest_event))
}

/// What the dispatcher did with the event; the runs themselves complete
/// in the background.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    dispatched: Vec<WorkflowId>,
    deduplicated: Vec<WorkflowId>,
}

async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    tracing::debug!(
        target: TRACING_TARGET,
        event_type = %event.event_type,
        entity_id = %event.entity_id,
        "event received",
    );
    let summary = state.service().on_event(event).await?;
    let response = IngestResponse {
        dispatched: summary.dispatched,
        deduplicated: summary.deduplicated,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}
