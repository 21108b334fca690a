//! Tool host: serves the notebook operations over HTTP.

use std::sync::Arc;

use tokio::net::TcpListener;

pub mod config;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod tools;

pub use config::HostConfig;
pub use error::{ApiError, RegistryError};
pub use registry::{Tool, ToolRegistry};
pub use tools::default_registry;

pub fn app(registry: ToolRegistry) -> axum::Router {
    routes::router(Arc::new(registry))
}

/// Serve `registry` on an already bound listener until the future is dropped.
pub async fn serve(listener: TcpListener, registry: ToolRegistry) -> std::io::Result<()> {
    axum::serve(listener, app(registry)).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use services::Capabilities;
    use tower::ServiceExt;

    use super::*;

    fn router(dir: &std::path::Path) -> axum::Router {
        app(default_registry(&Capabilities::heuristic(dir.to_path_buf())).unwrap())
    }

    async fn post(router: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unknown_operation_is_404_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post(router(dir.path()), "/tools/transmogrify", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "failure");
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn bad_arguments_are_422_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            post(router(dir.path()), "/tools/answer-query", r#"{"query": "x"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "invalid_arguments");

        let (status, body) = post(router(dir.path()), "/tools/answer-query", "not json").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "invalid_arguments");
    }

    #[tokio::test]
    async fn handler_failure_is_500_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post(
            router(dir.path()),
            "/tools/process-document",
            &json!({"file_path": "/missing/doc.txt"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "remote_execution_error");
    }

    #[tokio::test]
    async fn graph_payload_is_a_success_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post(
            router(dir.path()),
            "/tools/build-concept-graph",
            &json!({"summary": "Sky", "highlights": ["sky is blue"]}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["payload"]["outcome"], "rendered");
        let path = body["payload"]["artifact_path"].as_str().unwrap();
        assert!(std::path::Path::new(path).starts_with(dir.path()));
    }

    #[tokio::test]
    async fn lists_tools_and_reports_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tools: Vec<tool_client::ToolDescriptor> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(tools.len(), 3);

        let response = router(dir.path())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
