// src/lib.rs

use std::sync::Arc;

use anyhow::Result;

pub mod api;
pub mod blockchain;
pub mod config;
pub mod mcp;

/// Shared by every transport. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub dispatcher: mcp::dispatcher::Dispatcher,
}

impl AppState {
    pub fn new(config: config::Config, registry: mcp::registry::ToolRegistry) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: mcp::dispatcher::Dispatcher::new(Arc::new(registry)),
        }
    }

    /// Builds the outbound HTTP client and the tool registry for `config`.
    pub async fn from_config(config: config::Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config::REQUEST_TIMEOUT)
            .build()?;
        let registry = mcp::build_registry(&config, http).await?;
        Ok(Self::new(config, registry))
    }
}
