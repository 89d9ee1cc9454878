// src/main.rs

use anyhow::{Context, Result};
use somnia_mcp_server_rs::{api, config::Config, mcp::transport, AppState};
use std::{io, sync::Once};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: Once = Once::new();

fn init_tracing(stdio_mode: bool) {
    TRACING_INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "somnia_mcp_server_rs=debug,tower_http=debug".into());

        // stdout carries JSON-RPC frames in stdio mode.
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(!stdio_mode);

        if tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_err()
        {
            eprintln!("Failed to initialize tracing subscriber");
        }
    });
}

async fn run_http_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let network = state.config.network.display_name();
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🚀 Somnia MCP server listening on http://{}/mcp ({})", addr, network);
    axum::serve(listener, app).await.context("HTTP server failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` may choose the transport, so it is read before logging starts.
    dotenvy::dotenv().ok();
    let use_http = std::env::var("USE_STREAMABLE_HTTP").as_deref() == Ok("true");
    init_tracing(!use_http);

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Starting {} on {} (chain id {})",
        env!("CARGO_PKG_NAME"),
        config.chain.name,
        config.chain.chain_id
    );

    let state = AppState::from_config(config).await?;

    if state.config.use_streamable_http {
        run_http_server(state).await
    } else {
        info!("🚀 Starting MCP server on stdin/stdout...");
        transport::run_stdio(state).await
    }
}
