use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tool_client::{Operation, ToolFailure, ToolFailureKind, ToolResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tool(#[from] ToolFailure),
}

/// Raised while assembling the registry, before the host accepts requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation {0} is registered twice")]
    Duplicate(Operation),
}

fn status_for(kind: ToolFailureKind) -> StatusCode {
    match kind {
        ToolFailureKind::NotFound => StatusCode::NOT_FOUND,
        ToolFailureKind::InvalidArguments => StatusCode::UNPROCESSABLE_ENTITY,
        ToolFailureKind::RemoteExecutionError => StatusCode::INTERNAL_SERVER_ERROR,
        ToolFailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ToolFailureKind::TransportError => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Tool(failure) => {
                let status = status_for(failure.kind);
                if status.is_server_error() {
                    tracing::error!("[TOOL_HOST] {}", failure);
                } else {
                    tracing::debug!("[TOOL_HOST] Rejected request: {}", failure);
                }
                (status, Json(ToolResponse::from(failure))).into_response()
            }
        }
    }
}
