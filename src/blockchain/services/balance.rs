use crate::blockchain::client::SomniaClient;
use crate::blockchain::models::BalanceResponse;
use anyhow::Result;
use ethers_core::types::U256;
use ethers_core::utils::format_ether;
use tracing::info;

pub async fn get_balance(client: &SomniaClient, address: &str) -> Result<BalanceResponse> {
    info!(
        "Attempting to fetch balance for address: {} on {}",
        address,
        client.chain().name
    );

    let wei = client.get_balance(address).await?;
    Ok(to_response(address, wei, client.chain().currency_symbol))
}

pub fn to_response(address: &str, wei: U256, symbol: &str) -> BalanceResponse {
    BalanceResponse {
        address: address.to_string(),
        wei: wei.to_string(),
        formatted: format_ether(wei),
        symbol: symbol.to_string(),
    }
}
