// HTTP routes around the MCP endpoint

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{Request, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::Value;
use tower::{Service, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{GateState, HEALTH_PATH, RESOURCE_METADATA_PATH, bearer_gate};

/// Path the MCP service is mounted at.
pub const MCP_PATH: &str = "/mcp";

/// Build the public router: health, protected-resource metadata, and the MCP
/// service, all behind the bearer gate. CORS sits outside the gate so
/// preflight requests never need a token.
pub fn create_router<S>(gate: GateState, metadata: &Value, mcp_service: S) -> Result<Router>
where
    S: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    let metadata: Arc<str> = serde_json::to_string_pretty(metadata)?.into();

    let router = Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(RESOURCE_METADATA_PATH, get(resource_metadata).with_state(metadata))
        .nest_service(MCP_PATH, mcp_service)
        .layer(axum::middleware::from_fn_with_state(gate, bearer_gate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(router)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn resource_metadata(State(metadata): State<Arc<str>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        metadata.to_string(),
    )
        .into_response()
}
