//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::TRACING_TARGET;

/// Result type alias for handlers.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// The error type for HTTP handlers.
///
/// Maps runtime errors onto status codes and a small, stable JSON body;
/// internal details are logged, never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request conflicts with the resource's current state.
    #[error("{0}")]
    Conflict(String),
    /// The workflow failed structural validation.
    #[error("workflow failed validation")]
    Validation(Vec<String>),
    /// The request body or parameters are malformed.
    #[error("{0}")]
    BadRequest(String),
    /// Unexpected server-side failure.
    #[error("internal server error")]
    Internal(#[source] vaultflow_runtime::Error),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_failed",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_server_error",
        }
    }
}

impl From<vaultflow_runtime::Error> for ApiError {
    fn from(error: vaultflow_runtime::Error) -> Self {
        use vaultflow_runtime::Error;
        match error {
            Error::WorkflowNotFound(id) => Self::NotFound(format!("workflow not found: {id}")),
            Error::NotCompiled(id) => {
                Self::Conflict(format!("workflow {id} has no compiled form"))
            }
            Error::Compile(e) => Self::Validation(vec![e.to_string()]),
            Error::Serialization(e) => Self::BadRequest(e.to_string()),
            e @ Error::Internal(_) => Self::Internal(e),
        }
    }
}

/// JSON body sent for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    name: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            tracing::error!(target: TRACING_TARGET, error = %source, "handler failed");
        }

        let errors = match &self {
            Self::Validation(errors) => errors.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            name: self.name(),
            message: self.to_string(),
            errors,
        };
        (self.status(), Json(body)).into_response()
    }
}
