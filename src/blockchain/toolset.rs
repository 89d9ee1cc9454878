// src/blockchain/toolset.rs

//! On-chain actions for the agent wallet, offered as an external toolset.
//!
//! The toolset advertises itself in the provider listing format
//! (name + description + JSON Schema) and is merged into the registry
//! through [`crate::mcp::toolset::adapt_toolset`] like any other provider.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers_core::utils::to_checksum;
use ethers_signers::{LocalWallet, Signer};
use serde_json::{json, Value};
use tracing::info;

use crate::blockchain::client::SomniaClient;
use crate::blockchain::models::{ChainInfo, NativeTransferRequest};
use crate::blockchain::services::{balance, transactions, wallet};
use crate::config::{ADDRESS_REGEX, TXID_REGEX};
use crate::mcp::toolset::{ExternalTool, Toolset};

pub struct SomniaToolset {
    client: SomniaClient,
    wallet: LocalWallet,
}

impl SomniaToolset {
    pub fn new(client: SomniaClient, wallet: LocalWallet) -> Self {
        Self { client, wallet }
    }

    pub fn agent_address(&self) -> String {
        to_checksum(&self.wallet.address(), None)
    }

    async fn chain_info(&self) -> Result<Value> {
        let chain = self.client.chain();
        // The block height is informational; an unreachable node still yields static info.
        let latest_block = self.client.block_number().await.ok();
        Ok(serde_json::to_value(ChainInfo {
            name: chain.name.to_string(),
            network: chain.network,
            chain_id: chain.chain_id,
            rpc_url: chain.rpc_url.clone(),
            explorer_url: chain.explorer_url.to_string(),
            currency_symbol: chain.currency_symbol.to_string(),
            decimals: chain.decimals,
            latest_block,
        })?)
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing required argument '{}'", key))
}

fn check_address(address: &str) -> Result<()> {
    if !ADDRESS_REGEX.is_match(address) {
        bail!("'{}' is not a valid address", address);
    }
    Ok(())
}

fn with_0x(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{}", address)
    }
}

#[async_trait]
impl Toolset for SomniaToolset {
    fn provider(&self) -> &str {
        "somnia-chain"
    }

    async fn list_descriptors(&self) -> Result<Vec<ExternalTool>> {
        let tools = json!([
            {
                "name": "get_address",
                "description": "Get the address of the agent wallet",
                "parameters": { "type": "object", "properties": {} }
            },
            {
                "name": "get_chain_info",
                "description": "Get details of the connected Somnia network, including chain id and latest block",
                "parameters": { "type": "object", "properties": {} }
            },
            {
                "name": "get_balance",
                "description": "Get the native STT balance of an address (defaults to the agent wallet)",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "address": { "type": "string", "description": "The address to query" }
                    }
                }
            },
            {
                "name": "get_transaction",
                "description": "Look up a transaction and its receipt by hash",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "hash": { "type": "string", "description": "0x-prefixed 32-byte transaction hash" }
                    },
                    "required": ["hash"]
                }
            },
            {
                "name": "send_native",
                "description": "Send native STT from the agent wallet",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "to": { "type": "string", "description": "Recipient address" },
                        "amount_wei": { "type": "string", "description": "Amount in wei as a decimal string" },
                        "gas_limit": { "type": "integer", "minimum": 21000, "description": "Optional gas limit" }
                    },
                    "required": ["to", "amount_wei"]
                }
            },
            {
                "name": "sign_message",
                "description": "Sign a message with the agent wallet (EIP-191)",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string", "description": "The message to sign" }
                    },
                    "required": ["message"]
                }
            },
            {
                "name": "create_wallet",
                "description": "Generate a new wallet with a 12-word mnemonic. Save it with 'save_wallet' immediately.",
                "parameters": { "type": "object", "properties": {} }
            }
        ]);
        Ok(serde_json::from_value(tools)?)
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        info!("Invoking on-chain tool {}", name);
        match name {
            "get_address" => Ok(json!({
                "address": self.agent_address(),
                "network": self.client.chain().network,
            })),
            "get_chain_info" => self.chain_info().await,
            "get_balance" => {
                let address = match args.get("address").and_then(Value::as_str) {
                    Some(a) if !a.trim().is_empty() => {
                        check_address(a)?;
                        with_0x(a)
                    }
                    _ => self.agent_address(),
                };
                let res = balance::get_balance(&self.client, &address).await?;
                Ok(serde_json::to_value(res)?)
            }
            "get_transaction" => {
                let hash = required_str(&args, "hash")?;
                if !TXID_REGEX.is_match(hash) {
                    bail!("'{}' is not a valid transaction hash", hash);
                }
                match self.client.get_transaction(hash).await? {
                    Some(tx) => Ok(tx),
                    None => bail!("Transaction {} not found", hash),
                }
            }
            "send_native" => {
                let to = required_str(&args, "to")?;
                check_address(to)?;
                let request = NativeTransferRequest {
                    to_address: with_0x(to),
                    amount_wei: required_str(&args, "amount_wei")?.to_string(),
                    gas_limit: args.get("gas_limit").and_then(Value::as_u64),
                };
                let res = transactions::transfer_native(&self.client, &self.wallet, &request)
                    .await
                    .context("Transfer failed")?;
                Ok(serde_json::to_value(res)?)
            }
            "sign_message" => {
                let message = required_str(&args, "message")?;
                let signed = transactions::sign_message(&self.wallet, message).await?;
                Ok(serde_json::to_value(signed)?)
            }
            "create_wallet" => {
                let created = wallet::create_wallet()?;
                let mut value = serde_json::to_value(created)?;
                value["network"] = json!(self.client.chain().network);
                Ok(value)
            }
            other => bail!("Unknown on-chain tool '{}'", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::blockchain::services::wallet::agent_wallet;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn toolset() -> SomniaToolset {
        let chain = Network::Testnet.chain();
        let wallet = agent_wallet(KEY, chain.chain_id).unwrap();
        SomniaToolset::new(SomniaClient::new(reqwest::Client::new(), chain), wallet)
    }

    #[tokio::test]
    async fn every_listed_schema_is_an_object_schema() {
        let listed = toolset().list_descriptors().await.unwrap();
        assert_eq!(listed.len(), 7);
        for tool in listed {
            assert_eq!(tool.parameters["type"], "object", "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn reports_the_agent_address_offline() {
        let out = toolset().invoke("get_address", json!({})).await.unwrap();
        assert_eq!(out["address"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(out["network"], "TESTNET");
    }

    #[tokio::test]
    async fn rejects_malformed_hashes_before_any_rpc() {
        let err = toolset()
            .invoke("get_transaction", json!({ "hash": "0x1234" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a valid transaction hash"));
    }

    #[tokio::test]
    async fn rejects_malformed_recipients_before_any_rpc() {
        let err = toolset()
            .invoke("send_native", json!({ "to": "bob", "amount_wei": "1" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a valid address"));
    }

    #[tokio::test]
    async fn creates_wallets_tagged_with_the_network() {
        let out = toolset().invoke("create_wallet", json!({})).await.unwrap();
        assert_eq!(out["network"], "TESTNET");
        assert!(ADDRESS_REGEX.is_match(out["address"].as_str().unwrap()));
    }
}
