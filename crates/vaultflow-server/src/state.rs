//! Shared handler state.

use std::sync::Arc;

use vaultflow_runtime::RuntimeService;

/// State shared by every handler: a handle to the runtime service.
#[derive(Debug, Clone)]
pub struct AppState {
    service: Arc<RuntimeService>,
}

impl AppState {
    /// Creates the state around a runtime service.
    pub fn new(service: Arc<RuntimeService>) -> Self {
        Self { service }
    }

    /// Returns the runtime service.
    pub fn service(&self) -> &RuntimeService {
        &self.service
    }
}
