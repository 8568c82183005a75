//! Execution trace handlers.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;
use vaultflow_runtime::store::WorkflowId;
use vaultflow_runtime::trace::{ExecutionTrace, TraceId};

use crate::error::{ApiError, Result};
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/workflows/{id}/traces", get(list_traces))
        .route("/traces/{id}", get(get_trace))
}

async fn list_traces(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ExecutionTrace>>> {
    let workflow_id = WorkflowId::from_uuid(id);
    // Listing traces of an unknown workflow is a 404, not an empty list.
    state.service().get_workflow(workflow_id)?;
    Ok(Json(state.service().traces_for(workflow_id)?))
}

async fn get_trace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExecutionTrace>> {
    let trace_id = TraceId::from_uuid(id);
    state
        .service()
        .trace(trace_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("trace not found: {trace_id}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vaultflow_runtime::store::WorkflowRecord;
    use vaultflow_runtime::trace::ExecutionTrace;

    use super::super::testing::{server, valid_definition};

    #[tokio::test]
    async fn test_unknown_trace_is_404() {
        let (server, _) = server();
        let response = server.get(&format!("/traces/{}", uuid::Uuid::now_v7())).await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_traces_for_unknown_workflow_is_404() {
        let (server, _) = server();
        let response = server
            .get(&format!("/workflows/{}/traces", uuid::Uuid::now_v7()))
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_trace_listing_and_lookup_after_dispatch() {
        let (server, service) = server();
        let record: WorkflowRecord =
            server.post("/workflows").json(&valid_definition()).await.json();
        server
            .post(&format!("/workflows/{}/compile", record.id))
            .await
            .assert_status_ok();
        server
            .patch(&format!("/workflows/{}/status", record.id))
            .json(&json!({ "status": "ACTIVE" }))
            .await
            .assert_status_ok();
        server
            .post("/events")
            .json(&json!({
                "eventType": "ORDER_CREATED",
                "entityId": "order-1",
                "eventVersion": 1,
                "context": {}
            }))
            .await
            .assert_status(axum::http::StatusCode::ACCEPTED);
        service.drain().await;

        let listed = server.get(&format!("/workflows/{}/traces", record.id)).await;
        listed.assert_status_ok();
        let traces: Vec<ExecutionTrace> = listed.json();
        assert_eq!(traces.len(), 1);

        let fetched = server.get(&format!("/traces/{}", traces[0].trace_id)).await;
        fetched.assert_status_ok();
        assert_eq!(fetched.json::<ExecutionTrace>().trace_id, traces[0].trace_id);
    }
}
