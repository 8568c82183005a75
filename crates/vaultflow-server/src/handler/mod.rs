//! All `axum::`[`Router`]s with related handlers.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use vaultflow_runtime::action::{ActionRegistry, HttpRequestAction};
//! use vaultflow_runtime::RuntimeService;
//! use vaultflow_server::{routes, AppState};
//!
//! let mut registry = ActionRegistry::new();
//! registry.register(Arc::new(HttpRequestAction::new()));
//! let service = Arc::new(RuntimeService::new(Arc::new(registry)));
//! let router = routes(AppState::new(service));
//! ```
//!
//! [`Router`]: axum::routing::Router

mod events;
mod traces;
mod workflows;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the complete API router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .merge(workflows::routes())
        .merge(events::routes())
        .merge(traces::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
