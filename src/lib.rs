//! OAuth-protected MCP tool server.
//!
//! Every request outside the exempt paths must carry a bearer token accepted
//! by the configured validator. In provider mode the validated token reaches
//! each tool, which checks its own scope before acting on the in-memory to-do
//! store.

pub mod api;
pub mod auth;
pub mod config;
pub mod server;
pub mod todos;
pub mod tools;
pub mod types;

pub use auth::{AccessToken, AuthError, GateMode, JwtValidator, TokenValidator, ValidatorConfig};
pub use config::{GatewayConfig, ProviderConfig, ServerConfig};
pub use server::{McpServer, build_app, start_mcp_http};
pub use todos::{Todo, TodoStore};
pub use tools::{ToolHandler, ToolRegistry};

use std::sync::Arc;

use anyhow::Result;

/// Tools for the configured mode.
pub fn default_tools(mode: GateMode) -> ToolRegistry {
    match mode {
        GateMode::Gateway => tools::gateway_tools(),
        GateMode::Provider => tools::provider_tools(Arc::new(TodoStore::new())),
    }
}

/// Run the server for `config` with its default tools.
pub async fn run(config: ServerConfig) -> Result<()> {
    let registry = default_tools(config.mode);
    start_mcp_http(config, registry).await
}
