use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tool_catalog::{
    adapters::{demo_tools::demo_registry, server::CatalogServer},
    app::tool_list,
    domain::revision::{MODERN_PROTOCOL_VERSION, ProtocolRevision},
    infra::{config::AppConfig, metrics},
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "tool-catalog", version, about = "Serve the demo tool catalog over stdio")]
struct Cli {
    /// Directory holding default.toml / <profile>.toml / local.toml.
    #[arg(long, env = "APP_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Print the tools/list payload and exit instead of serving.
    #[arg(long)]
    print_tools: bool,
    /// Protocol revision claimed when printing the listing.
    #[arg(long, default_value = MODERN_PROTOCOL_VERSION)]
    protocol_version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    // stdout carries JSON-RPC frames; logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match &cli.config_dir {
        Some(dir) => AppConfig::load_from_dir(dir)?,
        None => AppConfig::load()?,
    };
    let registry = Arc::new(demo_registry(config.reregistration_policy));
    tracing::info!(
        tools = registry.len(),
        policy = ?registry.policy(),
        "registry ready"
    );

    if cli.print_tools {
        let revision = ProtocolRevision::from_claim(&cli.protocol_version);
        let listing = tool_list::build(registry.get_all(), revision);
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if let Some(metrics_cfg) = config.metrics_server_config()? {
        if metrics_cfg.auth_token.is_none() {
            tracing::warn!(
                addr = %metrics_cfg.addr,
                "metrics auth token missing; set METRICS_AUTH_TOKEN for production"
            );
        }
        metrics::spawn_metrics_server(metrics_cfg).await;
    }

    let server = CatalogServer::new(registry, config.server_name())
        .with_max_frame_bytes(config.max_frame_bytes());
    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
