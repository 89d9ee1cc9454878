// src/blockchain/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Network;

// --- Error types for wallet operations ---

#[derive(Error, Debug)]
pub enum WalletGenerationError {
    #[error("failed to generate mnemonic: {0}")]
    MnemonicError(#[from] bip39::Error),
    #[error("failed to derive wallet from mnemonic: {0}")]
    DerivationError(#[from] ethers_signers::WalletError),
}

// --- Wallet Models ---

/// A freshly generated wallet. The mnemonic is only ever returned once.
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub address: String,
    pub mnemonic: String,
    pub derivation_path: String,
}

// --- Chain Models ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainInfo {
    pub name: String,
    pub network: Network,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: String,
    pub currency_symbol: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_block: Option<u64>,
}

// --- Balance Models ---

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    /// Balance in wei, as a decimal string.
    pub wei: String,
    /// Balance in whole STT.
    pub formatted: String,
    pub symbol: String,
}

// --- Transfer Models ---

#[derive(Debug, Serialize, Deserialize)]
pub struct NativeTransferRequest {
    pub to_address: String,
    /// Amount in wei, as a decimal string.
    pub amount_wei: String,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount_wei: String,
    pub explorer_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedMessage {
    pub address: String,
    pub message: String,
    pub signature: String,
}
