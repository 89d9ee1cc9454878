// src/mcp/mod.rs

pub mod dispatcher;
pub mod docs_client;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod tools;
pub mod toolset;
pub mod transport;
pub mod wallet_storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, warn};

use crate::blockchain::client::SomniaClient;
use crate::blockchain::services::wallet::agent_wallet;
use crate::blockchain::toolset::SomniaToolset;
use crate::config::Config;
use docs_client::RemoteMcpToolset;
use registry::{CollisionPolicy, ToolRegistry};
use toolset::adapt_toolset;
use wallet_storage::WalletStore;

/// Builds the registry in its fixed order: on-chain toolset, documentation
/// toolset (when enabled), then native tools.
pub async fn build_registry(config: &Config, http: Client) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new(CollisionPolicy::Override);

    let wallet = agent_wallet(config.secret_key(), config.chain.chain_id)
        .context("AGENT_SECRET_KEY is not a usable signing key")?;
    let chain = SomniaToolset::new(SomniaClient::new(http.clone(), config.chain.clone()), wallet);
    info!("Agent wallet address: {}", chain.agent_address());
    registry.register(adapt_toolset(Arc::new(chain)).await?)?;

    if config.docs_mcp_enabled {
        let docs = Arc::new(RemoteMcpToolset::for_docs(http.clone(), &config.docs_url));
        match adapt_toolset(docs.clone()).await {
            Ok(tools) => registry.register(tools)?,
            Err(e) => warn!(
                endpoint = docs.endpoint(),
                "Somnia docs toolset unavailable, continuing without it: {:#}", e
            ),
        }
    }

    let store = Arc::new(WalletStore::new(config.wallet_data_dir.clone()));
    registry.register(tools::native_tools(config, store, http))?;

    info!("Registered {} tools", registry.len());
    Ok(registry)
}
