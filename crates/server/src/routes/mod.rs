use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;

use crate::{middleware as app_middleware, registry::ToolRegistry};

pub mod health;
pub mod tools;

pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(tools::router())
        .with_state(registry)
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
}
