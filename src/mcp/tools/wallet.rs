// src/mcp/tools/wallet.rs

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::Network;
use crate::mcp::schema::{Field, ToolSchema};
use crate::mcp::tool::{handler_fn, success, ToolDescriptor, ToolFailure, ToolResult};
use crate::mcp::wallet_storage::{NewWallet, WalletRecord, WalletStore};

const NETWORKS: &[&str] = &["MAINNET", "TESTNET"];

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn parse_network(value: &str) -> Option<Network> {
    match value {
        "MAINNET" => Some(Network::Mainnet),
        "TESTNET" => Some(Network::Testnet),
        _ => None,
    }
}

/// Chat-ready summary of a freshly saved wallet.
pub fn notification_message(record: &WalletRecord) -> String {
    format!(
        "🔐 **New Wallet Saved**\n\n\
         📛 **Label:** {}\n\
         🌐 **Network:** {}\n\
         📅 **Created:** {}\n\n\
         💼 **Address:**\n`{}`\n\n\
         🔑 **Mnemonic:**\n`{}`\n\n\
         ⚠️ **IMPORTANT:** Keep this mnemonic phrase safe and never share it with anyone!",
        record.label,
        record.network.as_str(),
        record.created_at,
        record.address,
        record.mnemonic,
    )
}

pub async fn save_wallet(store: &WalletStore, args: Value) -> ToolResult {
    let Some(network) = parse_network(str_arg(&args, "network")) else {
        return Err(ToolFailure::message("network must be MAINNET or TESTNET"));
    };
    let wallet = NewWallet {
        address: str_arg(&args, "address").to_string(),
        mnemonic: str_arg(&args, "mnemonic").to_string(),
        network,
        label: args
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    match store.save(wallet).await {
        Ok((record, entry)) => success(json!({
            "message": notification_message(&record),
            "walletInfo": {
                "address": record.address,
                "network": record.network,
                "label": record.label,
                "createdAt": record.created_at,
            },
            "filename": entry.filename,
            "instruction": "Use send_telegram_message to forward this message to your configured chat",
        })),
        Err(e) => {
            error!("Failed to save wallet: {}", e);
            Err(ToolFailure::message(format!("Failed to save wallet: {}", e)))
        }
    }
}

pub async fn list_wallets(store: &WalletStore, args: Value) -> ToolResult {
    let filter = match args.get("network").and_then(Value::as_str) {
        Some(n) => match parse_network(n) {
            Some(network) => Some(network),
            None => return Err(ToolFailure::message("network must be MAINNET or TESTNET")),
        },
        None => None,
    };

    let entries = store
        .list()
        .await
        .map_err(|e| ToolFailure::message(format!("Failed to list wallets: {}", e)))?;
    let wallets: Vec<_> = entries
        .into_iter()
        .filter(|e| filter.map_or(true, |n| e.network == n))
        .collect();

    info!("Listing {} saved wallets", wallets.len());
    success(json!({
        "count": wallets.len(),
        "wallets": wallets,
    }))
}

pub async fn get_wallet(store: &WalletStore, args: Value) -> ToolResult {
    let address = str_arg(&args, "address");
    match store.get(address).await {
        Ok(Some(record)) => success(json!({ "wallet": record })),
        Ok(None) => Err(ToolFailure::message(format!(
            "No saved wallet found for address {}",
            address
        ))),
        Err(e) => Err(ToolFailure::message(format!("Failed to read wallet: {}", e))),
    }
}

pub fn descriptors(store: Arc<WalletStore>) -> Vec<ToolDescriptor> {
    let save_store = store.clone();
    let list_store = store.clone();
    let get_store = store;

    vec![
        ToolDescriptor::new(
            "save_wallet",
            "Persist wallet details (address, mnemonic, network) to the local wallet store. Returns a formatted message that can be sent via Telegram.",
            ToolSchema::object()
                .field(Field::string("address").min_len(1).describe("Wallet address"))
                .field(Field::string("mnemonic").min_len(1).describe("Wallet mnemonic phrase"))
                .field(Field::one_of("network", NETWORKS).describe("Network the wallet is for"))
                .field(
                    Field::string("label")
                        .optional()
                        .describe("Optional label/name for the wallet"),
                ),
            handler_fn(move |args| {
                let store = save_store.clone();
                async move { save_wallet(&store, args).await }
            }),
        )
        .with_title("Save Wallet"),
        ToolDescriptor::new(
            "list_wallets",
            "List saved wallets, optionally filtered by network. Mnemonics are not included.",
            ToolSchema::object().field(
                Field::one_of("network", NETWORKS)
                    .optional()
                    .describe("Only list wallets for this network"),
            ),
            handler_fn(move |args| {
                let store = list_store.clone();
                async move { list_wallets(&store, args).await }
            }),
        )
        .with_title("List Saved Wallets"),
        ToolDescriptor::new(
            "get_wallet",
            "Retrieve a saved wallet, including its mnemonic, by address",
            ToolSchema::object()
                .field(Field::string("address").min_len(1).describe("Wallet address")),
            handler_fn(move |args| {
                let store = get_store.clone();
                async move { get_wallet(&store, args).await }
            }),
        )
        .with_title("Get Saved Wallet"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tool::ToolOutput;

    fn payload(result: ToolResult) -> Value {
        match result.unwrap() {
            ToolOutput::Json(v) => v,
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[tokio::test]
    async fn save_returns_a_notification_with_the_label() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        let out = payload(
            save_wallet(
                &store,
                json!({ "address": "0xabc", "mnemonic": "word1 word2", "network": "TESTNET", "label": "test" }),
            )
            .await,
        );
        assert_eq!(out["success"], true);
        assert_eq!(out["walletInfo"]["label"], "test");
        let message = out["message"].as_str().unwrap();
        assert!(message.contains("`0xabc`"));
        assert!(message.contains("TESTNET"));
        assert!(out["filename"].as_str().unwrap().starts_with("wallet-testnet-"));
    }

    #[tokio::test]
    async fn list_filters_by_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        for (address, network) in [("0x1", "MAINNET"), ("0x2", "TESTNET"), ("0x3", "TESTNET")] {
            save_wallet(
                &store,
                json!({ "address": address, "mnemonic": "m", "network": network }),
            )
            .await
            .unwrap();
        }

        let all = payload(list_wallets(&store, json!({})).await);
        assert_eq!(all["count"], 3);
        let testnet = payload(list_wallets(&store, json!({ "network": "TESTNET" })).await);
        assert_eq!(testnet["count"], 2);
        assert!(testnet["wallets"][0].get("mnemonic").is_none());
    }

    #[tokio::test]
    async fn missing_wallet_is_a_business_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        let err = get_wallet(&store, json!({ "address": "0xdead" })).await.unwrap_err();
        assert_eq!(err.get("success"), Some(&json!(false)));
        assert!(err.text().contains("0xdead"));
    }
}
