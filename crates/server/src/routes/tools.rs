use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
};
use serde_json::Value;
use tool_client::{ToolDescriptor, ToolFailure, ToolResponse};
use tracing::{Instrument, info};

use crate::{error::ApiError, middleware::RequestId, registry::ToolRegistry};

/// `POST /tools/{operation}`. The operation is resolved before the body is
/// looked at, so an unknown name is `not_found` whatever the arguments.
async fn invoke_tool(
    State(registry): State<Arc<ToolRegistry>>,
    Path(name): Path<String>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ToolResponse>, ApiError> {
    let operation = registry.resolve(&name)?;
    let arguments: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ToolFailure::invalid_arguments(format!("request body is not JSON: {}", e))
        })?
    };

    let span = tracing::info_span!("tool", %operation, request_id = %request_id.as_str());
    async move {
        info!("[TOOL_HOST] Invoking {}", operation);
        let payload = registry.execute(operation, arguments).await?;
        info!("[TOOL_HOST] {} finished", operation);
        Ok::<_, ApiError>(Json(ToolResponse::success(payload)))
    }
    .instrument(span)
    .await
}

async fn list_tools(State(registry): State<Arc<ToolRegistry>>) -> Json<Vec<ToolDescriptor>> {
    Json(registry.descriptors())
}

pub fn router() -> Router<Arc<ToolRegistry>> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{operation}", post(invoke_tool))
}
