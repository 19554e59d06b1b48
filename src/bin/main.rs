use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Subscriber, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

use mcp_oauth_gate::config::DEFAULT_PORT;
use mcp_oauth_gate::{GatewayConfig, ProviderConfig};

#[derive(Parser)]
#[command(name = "mcp-oauth-gate")]
#[command(about = "MCP tool server protected by OAuth bearer tokens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate tokens in HTTP middleware and forward requests unchanged
    Gateway {
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Authorization server environment URL (token issuer)
        #[arg(long, env = "SK_ENV_URL")]
        env_url: String,
        #[arg(long, env = "SK_CLIENT_ID")]
        client_id: Option<String>,
        #[arg(long, env = "SK_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
        /// Expected token audience
        #[arg(long, env = "EXPECTED_AUDIENCE")]
        audience: Option<String>,
        /// Protected resource metadata JSON, served verbatim
        #[arg(long, env = "PROTECTED_RESOURCE_METADATA")]
        resource_metadata: String,
        /// JWKS endpoint (default: <env-url>/keys)
        #[arg(long, env = "SK_JWKS_URL")]
        jwks_url: Option<String>,
    },
    /// Validate tokens and let each tool check its required scope
    Provider {
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Authorization server environment URL (token issuer)
        #[arg(long, env = "SCALEKIT_ENVIRONMENT_URL")]
        environment_url: String,
        #[arg(long, env = "SCALEKIT_CLIENT_ID")]
        client_id: Option<String>,
        /// Protected resource id (expected token audience)
        #[arg(long, env = "SCALEKIT_RESOURCE_ID")]
        resource_id: String,
        /// Public URL of the MCP endpoint (default: http://localhost:<port>/mcp)
        #[arg(long, env = "MCP_URL")]
        mcp_url: Option<String>,
        /// JWKS endpoint (default: <environment-url>/keys)
        #[arg(long, env = "SCALEKIT_JWKS_URL")]
        jwks_url: Option<String>,
    },
}

/// `RUST_LOG` plus the crate defaults.
fn log_filter(env: EnvFilter) -> Result<EnvFilter> {
    Ok(env
        .add_directive("mcp_oauth_gate=info".parse()?)
        .add_directive("rmcp=warn".parse()?))
}

fn log_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    log_subscriber(log_filter(EnvFilter::from_default_env())?).init();

    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Gateway {
            port,
            env_url,
            client_id,
            client_secret,
            audience,
            resource_metadata,
            jwks_url,
        } => {
            info!(
                client_id = client_id.as_deref().unwrap_or("-"),
                client_secret_set = client_secret.is_some(),
                "Starting gateway-style server"
            );
            if audience.as_deref().is_none_or(str::is_empty) {
                warn!("EXPECTED_AUDIENCE not set - token audience will not be checked");
            }
            GatewayConfig {
                port,
                env_url,
                client_id,
                client_secret,
                expected_audience: audience,
                resource_metadata,
                jwks_url,
            }
            .into_server_config()?
        }
        Commands::Provider {
            port,
            environment_url,
            client_id,
            resource_id,
            mcp_url,
            jwks_url,
        } => {
            info!(
                client_id = client_id.as_deref().unwrap_or("-"),
                resource_id = %resource_id,
                "Starting provider-style server"
            );
            ProviderConfig {
                port,
                environment_url,
                client_id,
                resource_id,
                mcp_url,
                jwks_url,
            }
            .into_server_config()?
        }
    };

    mcp_oauth_gate::run(config).await
}
