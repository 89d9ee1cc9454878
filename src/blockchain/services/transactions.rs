// src/blockchain/services/transactions.rs

use anyhow::{anyhow, Result};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, TransactionRequest, U256};
use ethers_core::utils::to_checksum;
use ethers_signers::{LocalWallet, Signer};
use std::str::FromStr;
use tracing::info;

use crate::blockchain::client::SomniaClient;
use crate::blockchain::models::{NativeTransferRequest, SignedMessage, TransactionResponse};

const DEFAULT_TRANSFER_GAS: u64 = 21_000;

/// Transfers native STT from the agent wallet.
pub async fn transfer_native(
    client: &SomniaClient,
    wallet: &LocalWallet,
    request: &NativeTransferRequest,
) -> Result<TransactionResponse> {
    info!("Initiating native transfer");
    let to_address = Address::from_str(&request.to_address)
        .map_err(|_| anyhow!("Invalid recipient address '{}'", request.to_address))?;
    let value = U256::from_dec_str(&request.amount_wei)
        .map_err(|_| anyhow!("amount_wei must be a decimal integer, got '{}'", request.amount_wei))?;

    let from = to_checksum(&wallet.address(), None);
    let nonce = client.get_transaction_count(&from).await?;
    let gas_price = client.gas_price().await?;
    let gas_limit = U256::from(request.gas_limit.unwrap_or(DEFAULT_TRANSFER_GAS));

    let tx = TransactionRequest::new()
        .to(to_address)
        .value(value)
        .from(wallet.address())
        .nonce(nonce)
        .chain_id(client.chain().chain_id)
        .gas(gas_limit)
        .gas_price(gas_price);

    info!("Sending transaction with parameters:");
    info!("From: {:?}", wallet.address());
    info!("To: {:?}", to_address);
    info!("Value: {:?}", value);
    info!("Nonce: {:?}", nonce);
    info!("Gas Limit: {:?}", gas_limit);
    info!("Gas Price: {:?}", gas_price);

    let tx_hash = send_transaction(client, wallet, tx).await?;
    Ok(TransactionResponse {
        explorer_url: format!("{}/tx/{}", client.chain().explorer_url, tx_hash),
        tx_hash,
        from,
        to: to_checksum(&to_address, None),
        amount_wei: value.to_string(),
    })
}

async fn send_transaction(
    client: &SomniaClient,
    wallet: &LocalWallet,
    tx: TransactionRequest,
) -> Result<String> {
    let typed: TypedTransaction = tx.clone().into();
    let signature = wallet.sign_transaction(&typed).await?;
    let raw_tx = tx.rlp_signed(&signature);
    client.send_raw_transaction(&raw_tx).await
}

/// EIP-191 personal-sign of an arbitrary message with the agent key.
pub async fn sign_message(wallet: &LocalWallet, message: &str) -> Result<SignedMessage> {
    let signature = wallet.sign_message(message).await?;
    Ok(SignedMessage {
        address: to_checksum(&wallet.address(), None),
        message: message.to_string(),
        signature: format!("0x{}", signature),
    })
}
