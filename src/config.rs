//! Server configuration for the two deployment styles.
//!
//! Values arrive from CLI flags or their environment variables (see the
//! binary) and are passed through to the validator, the challenge header,
//! and the metadata document.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use url::Url;

use crate::auth::{GateMode, RESOURCE_METADATA_PATH, ValidatorConfig};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3002;

/// Gateway deployment: validate at the HTTP layer, forward unchanged.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Authorization server environment URL, also the expected issuer.
    pub env_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub expected_audience: Option<String>,
    /// Protected-resource metadata JSON, served verbatim.
    pub resource_metadata: String,
    /// JWKS location override; defaults to `<env_url>/keys`.
    pub jwks_url: Option<String>,
}

/// Provider deployment: validate, then scope-check inside each tool.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub port: u16,
    /// Authorization server environment URL, also the expected issuer.
    pub environment_url: String,
    pub client_id: Option<String>,
    /// Protected resource id, the expected token audience.
    pub resource_id: String,
    /// Public URL of the MCP endpoint; defaults to `http://localhost:<port>/mcp`.
    pub mcp_url: Option<String>,
    pub jwks_url: Option<String>,
}

/// Source of the `/.well-known/oauth-protected-resource` document.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceMetadata {
    /// Served as configured.
    Static(Value),
    /// Built from the resource and its authorization server.
    Generated {
        resource: String,
        authorization_server: String,
    },
}

impl ResourceMetadata {
    /// Document to serve. `scopes` only affects generated metadata.
    pub fn render(&self, scopes: &[String]) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Generated {
                resource,
                authorization_server,
            } => json!({
                "resource": resource,
                "authorization_servers": [authorization_server],
                "bearer_methods_supported": ["header"],
                "scopes_supported": scopes,
            }),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub mode: GateMode,
    pub validator: ValidatorConfig,
    /// Advertised in the `WWW-Authenticate` challenge.
    pub resource_metadata_url: String,
    pub resource_metadata: ResourceMetadata,
}

impl GatewayConfig {
    pub fn into_server_config(self) -> Result<ServerConfig> {
        let metadata: Value = serde_json::from_str(&self.resource_metadata)
            .context("PROTECTED_RESOURCE_METADATA is not valid JSON")?;

        let mut validator = ValidatorConfig::for_issuer(&self.env_url, self.expected_audience);
        if let Some(jwks_url) = self.jwks_url {
            validator = validator.with_jwks_url(jwks_url);
        }

        Ok(ServerConfig {
            bind: bind_address(self.port),
            mode: GateMode::Gateway,
            validator,
            resource_metadata_url: format!(
                "http://localhost:{}{}",
                self.port, RESOURCE_METADATA_PATH
            ),
            resource_metadata: ResourceMetadata::Static(metadata),
        })
    }
}

impl ProviderConfig {
    pub fn into_server_config(self) -> Result<ServerConfig> {
        let mcp_url = self
            .mcp_url
            .unwrap_or_else(|| format!("http://localhost:{}/mcp", self.port));
        let parsed = Url::parse(&mcp_url).with_context(|| format!("Invalid MCP_URL: {}", mcp_url))?;
        let resource_metadata_url = parsed
            .join(RESOURCE_METADATA_PATH)
            .with_context(|| format!("Cannot derive metadata URL from {}", mcp_url))?
            .to_string();

        let authorization_server = format!(
            "{}/resources/{}",
            self.environment_url.trim_end_matches('/'),
            self.resource_id
        );

        let mut validator =
            ValidatorConfig::for_issuer(&self.environment_url, Some(self.resource_id));
        if let Some(jwks_url) = self.jwks_url {
            validator = validator.with_jwks_url(jwks_url);
        }

        Ok(ServerConfig {
            bind: bind_address(self.port),
            mode: GateMode::Provider,
            validator,
            resource_metadata_url,
            resource_metadata: ResourceMetadata::Generated {
                resource: mcp_url,
                authorization_server,
            },
        })
    }
}

fn bind_address(port: u16) -> String {
    format!("0.0.0.0:{}", port)
}
