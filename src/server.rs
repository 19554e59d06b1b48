//! MCP server implementation using rmcp.
//!
//! Serves the tool registry over streamable HTTP, behind the bearer gate.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};
use serde_json::Value;
use tracing::info;

use crate::api::create_router;
use crate::auth::{AccessToken, GateState, JwtValidator};
use crate::config::ServerConfig;
use crate::tools::{ToolContext, ToolRegistry};

/// Type alias for HTTP request parts stored in rmcp extensions.
type HttpParts = http::request::Parts;

/// MCP server that handles protocol requests and delegates to tool handlers.
#[derive(Clone)]
pub struct McpServer {
    tool_registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self { tool_registry }
    }

    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }
}

/// Token the bearer gate attached to the HTTP request behind this call.
fn access_token(context: &RequestContext<RoleServer>) -> Option<AccessToken> {
    context
        .extensions
        .get::<HttpParts>()
        .and_then(|parts| parts.extensions.get::<AccessToken>())
        .cloned()
}

impl ServerHandler for McpServer {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.tool_registry.list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        let registry = self.tool_registry.clone();
        let ctx = ToolContext::new(access_token(&context));

        async move {
            if !registry.contains(&tool_name) {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {}", tool_name),
                    None,
                ));
            }
            registry
                .call_tool(&tool_name, args, &ctx)
                .await
                .map_err(|e| McpError::internal_error(format!("Tool execution failed: {}", e), None))
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "OAuth-protected MCP server. Requests need a bearer token; \
                 tools check the token's scopes before acting."
                    .to_string(),
            ),
        }
    }
}

/// Build the full HTTP application for `config` and `registry`.
///
/// The MCP endpoint is mounted at `/mcp` in stateless mode: every request is
/// independent, so the token checked by the gate is the one the tools see.
pub fn build_app(config: &ServerConfig, registry: ToolRegistry) -> Result<Router> {
    let validator = JwtValidator::from_jwks(&config.validator)
        .map_err(|e| anyhow::anyhow!("Failed to create token validator: {}", e))?;
    let gate = GateState::new(
        Arc::new(validator),
        &config.resource_metadata_url,
        config.mode,
    )?;

    let metadata = config
        .resource_metadata
        .render(&registry.required_scopes());
    mcp_router(gate, &metadata, registry)
}

fn mcp_router(gate: GateState, metadata: &Value, registry: ToolRegistry) -> Result<Router> {
    let tool_registry = Arc::new(registry);

    let service = StreamableHttpService::new(
        move || Ok(McpServer::new(tool_registry.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );

    create_router(gate, metadata, service)
}

/// Start the MCP HTTP server and run until Ctrl-C or SIGTERM.
pub async fn start_mcp_http(config: ServerConfig, registry: ToolRegistry) -> Result<()> {
    let app = build_app(&config, registry)?;
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    info!(
        mode = ?config.mode,
        issuer = %config.validator.issuer,
        jwks_url = %config.validator.jwks_url,
        "MCP HTTP server listening on http://{}/mcp",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("MCP HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
