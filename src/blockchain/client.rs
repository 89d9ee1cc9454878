// src/blockchain/client.rs

use anyhow::{anyhow, Context, Result};
use ethers_core::types::{Bytes, U256};
use reqwest::Client as ReqwestClient;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::debug;

use crate::config::ChainConfig;

// --- SomniaClient Implementation ---

/// Thin JSON-RPC client for one Somnia network.
#[derive(Clone, Debug)]
pub struct SomniaClient {
    client: ReqwestClient,
    chain: ChainConfig,
}

impl SomniaClient {
    pub fn new(client: ReqwestClient, chain: ChainConfig) -> Self {
        Self { client, chain }
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Sends one JSON-RPC call and returns its `result`.
    pub async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!("Sending RPC request {} to {}", method, self.chain.rpc_url);

        let response = self
            .client
            .post(&self.chain.rpc_url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", method, status));
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", method))?;

        if let Some(error) = body.get("error") {
            return Err(anyhow!("RPC Error: {}", error));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| anyhow!("RPC response missing 'result' field: {:?}", body))
    }

    async fn rpc_quantity(&self, method: &str, params: Value) -> Result<U256> {
        let result = self.rpc(method, params).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| anyhow!("{} returned a non-string quantity: {}", method, result))?;
        U256::from_str(hex).map_err(|_| anyhow!("Failed to parse {} result '{}'", method, hex))
    }

    pub async fn get_balance(&self, address: &str) -> Result<U256> {
        self.rpc_quantity("eth_getBalance", json!([address, "latest"]))
            .await
    }

    pub async fn get_transaction_count(&self, address: &str) -> Result<U256> {
        self.rpc_quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    pub async fn gas_price(&self) -> Result<U256> {
        self.rpc_quantity("eth_gasPrice", json!([])).await
    }

    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.rpc_quantity("eth_blockNumber", json!([])).await?.as_u64())
    }

    /// `None` when the node does not know the hash.
    pub async fn get_transaction(&self, hash: &str) -> Result<Option<Value>> {
        let tx = self.rpc("eth_getTransactionByHash", json!([hash])).await?;
        if tx.is_null() {
            return Ok(None);
        }
        let receipt = self.rpc("eth_getTransactionReceipt", json!([hash])).await?;
        let mut tx = tx;
        if let Value::Object(map) = &mut tx {
            map.insert("receipt".into(), receipt);
        }
        Ok(Some(tx))
    }

    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<String> {
        let result = self.rpc("eth_sendRawTransaction", json!([raw])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Failed to extract transaction hash from response"))
    }
}
