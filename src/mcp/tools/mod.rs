// src/mcp/tools/mod.rs

pub mod search;
pub mod telegram;
pub mod wallet;

use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::mcp::tool::ToolDescriptor;
use crate::mcp::wallet_storage::WalletStore;

use search::BraveSearch;
use telegram::TelegramBot;

/// Tools implemented in this crate, in registration order.
pub fn native_tools(config: &Config, store: Arc<WalletStore>, http: Client) -> Vec<ToolDescriptor> {
    let mut tools = search::descriptors(BraveSearch::new(http.clone(), config.brave_api_key.clone()));
    tools.extend(wallet::descriptors(store));
    tools.extend(telegram::descriptors(TelegramBot::new(
        http,
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    )));
    tools
}
